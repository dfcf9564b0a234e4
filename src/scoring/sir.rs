//! SATD Impact Ripple (SIR) scoring.
//!
//! Three graph metrics are computed per marker and each is normalized
//! against its graph-wide maximum:
//!
//! - **fanout**: sum of outgoing relationship strengths
//! - **chain length**: weight of the heaviest simple path starting at the
//!   marker, at most `max_hops` edges long
//! - **reachability**: over every marker reachable within `max_hops`, the
//!   sum of the best path weight to it, where a path's weight is the
//!   product of its strengths
//!
//! `SIR = alpha * fanout + beta * chain + gamma * reach`, clamped to [0, 1].

use crate::config::SirWeights;
use crate::core::MarkerId;
use crate::graph::{Link, SatdGraph};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Normalized SIR components plus the raw values they came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SirComponents {
    pub fanout: f64,
    pub chain_length: f64,
    pub reachability: f64,
    pub raw_fanout: f64,
    pub raw_chain_length: f64,
    pub raw_reachability: f64,
}

impl SirComponents {
    pub fn combine(&self, weights: &SirWeights) -> f64 {
        (weights.alpha * self.fanout
            + weights.beta * self.chain_length
            + weights.gamma * self.reachability)
            .clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImpactTier {
    Low,
    Medium,
    High,
}

impl ImpactTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            ImpactTier::High
        } else if score >= 0.4 {
            ImpactTier::Medium
        } else {
            ImpactTier::Low
        }
    }
}

impl fmt::Display for ImpactTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpactTier::High => write!(f, "HIGH"),
            ImpactTier::Medium => write!(f, "MEDIUM"),
            ImpactTier::Low => write!(f, "LOW"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SirScore {
    pub marker_id: MarkerId,
    pub components: SirComponents,
    pub sir: f64,
    pub tier: ImpactTier,
}

/// Raw, unnormalized metrics for one node.
#[derive(Debug, Clone, Copy, Default)]
struct RawMetrics {
    fanout: f64,
    chain_length: f64,
    reachability: f64,
}

pub struct SirScorer {
    weights: SirWeights,
    max_hops: usize,
}

impl SirScorer {
    pub fn new(weights: SirWeights, max_hops: usize) -> Self {
        Self { weights, max_hops }
    }

    /// Score every node in the graph, isolated ones included.
    ///
    /// The result is keyed by marker id. Node metrics are independent of
    /// one another, so they are computed in parallel over the read-only
    /// graph.
    pub fn calculate_sir_scores(&self, graph: &SatdGraph) -> BTreeMap<MarkerId, SirScore> {
        let ids: Vec<&MarkerId> = graph.node_ids().collect();
        let raw: Vec<RawMetrics> = ids
            .par_iter()
            .map(|id| RawMetrics {
                fanout: weighted_fanout(&graph.forward, id),
                chain_length: heaviest_chain(&graph.forward, id, self.max_hops),
                reachability: bounded_reachability(&graph.forward, id, self.max_hops),
            })
            .collect();

        let max_of = |f: fn(&RawMetrics) -> f64| raw.iter().map(f).fold(0.0, f64::max);
        let max_fanout = max_of(|m| m.fanout);
        let max_chain = max_of(|m| m.chain_length);
        let max_reach = max_of(|m| m.reachability);

        ids.into_iter()
            .zip(raw)
            .map(|(id, metrics)| {
                let components = SirComponents {
                    fanout: normalize(metrics.fanout, max_fanout),
                    chain_length: normalize(metrics.chain_length, max_chain),
                    reachability: normalize(metrics.reachability, max_reach),
                    raw_fanout: metrics.fanout,
                    raw_chain_length: metrics.chain_length,
                    raw_reachability: metrics.reachability,
                };
                let sir = components.combine(&self.weights);
                let score = SirScore {
                    marker_id: id.clone(),
                    components,
                    sir,
                    tier: ImpactTier::from_score(sir),
                };
                (id.clone(), score)
            })
            .collect()
    }
}

/// Order scores by descending SIR; equal scores fall back to marker id.
pub fn rank_by_sir(scores: &BTreeMap<MarkerId, SirScore>) -> Vec<SirScore> {
    let mut ranked: Vec<SirScore> = scores.values().cloned().collect();
    ranked.sort_by(|a, b| {
        b.sir
            .total_cmp(&a.sir)
            .then_with(|| a.marker_id.cmp(&b.marker_id))
    });
    ranked
}

fn normalize(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

type Adjacency = BTreeMap<MarkerId, Vec<Link>>;

fn weighted_fanout(adj: &Adjacency, id: &str) -> f64 {
    adj.get(id)
        .map(|links| links.iter().map(|l| l.weight).sum())
        .unwrap_or(0.0)
}

/// Heaviest simple path from `start` of at most `max_hops` edges.
pub fn heaviest_chain(adj: &Adjacency, start: &str, max_hops: usize) -> f64 {
    let mut search = ChainSearch {
        adj,
        memo: HashMap::new(),
    };
    let mut on_path = BTreeSet::new();
    search.heaviest(start, max_hops, &mut on_path).value
}

#[derive(Debug, Clone, Copy)]
struct PathResult {
    value: f64,
    /// Deepest level the search below this node went.
    depth: usize,
    /// A cycle or the hop bound cut some branch short, so the value
    /// depends on the path that led here.
    truncated: bool,
}

/// Depth-first longest-path search.
///
/// Cycle protection is per path: a node on the current path is skipped,
/// but it may be visited again along another path. A result is memoized
/// only when no branch below it was cut short, in which case it holds for
/// any caller with at least `depth` hops left.
struct ChainSearch<'g> {
    adj: &'g Adjacency,
    memo: HashMap<&'g str, (f64, usize)>,
}

impl<'g> ChainSearch<'g> {
    fn heaviest(&mut self, node: &'g str, remaining: usize, on_path: &mut BTreeSet<&'g str>) -> PathResult {
        let adj = self.adj;
        let links: &'g [Link] = adj.get(node).map(Vec::as_slice).unwrap_or(&[]);

        if remaining == 0 {
            return PathResult {
                value: 0.0,
                depth: 0,
                truncated: !links.is_empty(),
            };
        }
        if let Some(&(value, depth)) = self.memo.get(node) {
            if depth <= remaining {
                return PathResult {
                    value,
                    depth,
                    truncated: false,
                };
            }
        }

        on_path.insert(node);
        let mut best = 0.0_f64;
        let mut depth = 0;
        let mut truncated = false;
        for link in links {
            let next = link.node.as_str();
            if on_path.contains(next) {
                truncated = true;
                continue;
            }
            let below = self.heaviest(next, remaining - 1, on_path);
            truncated |= below.truncated;
            depth = depth.max(below.depth + 1);
            best = best.max(link.weight + below.value);
        }
        on_path.remove(node);

        if !truncated {
            self.memo.insert(node, (best, depth));
        }
        PathResult {
            value: best,
            depth,
            truncated,
        }
    }
}

/// Sum over nodes reachable within `max_hops` of the best path weight,
/// a path's weight being the product of its link strengths.
pub fn bounded_reachability(adj: &Adjacency, start: &str, max_hops: usize) -> f64 {
    let mut best: BTreeMap<&str, f64> = BTreeMap::new();
    let mut frontier: BTreeMap<&str, f64> = BTreeMap::from([(start, 1.0)]);

    for _ in 0..max_hops {
        let mut next: BTreeMap<&str, f64> = BTreeMap::new();
        for (&node, &weight) in &frontier {
            for link in adj.get(node).map(Vec::as_slice).unwrap_or(&[]) {
                let target = link.node.as_str();
                if target == start {
                    continue;
                }
                let candidate = weight * link.weight;
                if candidate > best.get(target).copied().unwrap_or(0.0) {
                    best.insert(target, candidate);
                    let slot = next.entry(target).or_insert(0.0);
                    *slot = slot.max(candidate);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    best.values().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DebtMarker;
    use crate::graph::{RelationType, WeightedEdge};

    fn graph(ids: &[&str], edges: &[(&str, &str, f64)]) -> SatdGraph {
        let markers: Vec<_> = ids
            .iter()
            .map(|id| DebtMarker::new(*id, "a.py", 1, "TODO"))
            .collect();
        let edges = edges
            .iter()
            .map(|(s, t, w)| WeightedEdge::new(*s, *t, RelationType::Call, *w, 1))
            .collect();
        SatdGraph::build(&markers, edges)
    }

    #[test]
    fn test_heaviest_chain_on_path() {
        let g = graph(&["a", "b", "c"], &[("a", "b", 0.8), ("b", "c", 0.8)]);
        assert!((heaviest_chain(&g.forward, "a", 5) - 1.6).abs() < 1e-9);
        assert!((heaviest_chain(&g.forward, "b", 5) - 0.8).abs() < 1e-9);
        assert_eq!(heaviest_chain(&g.forward, "c", 5), 0.0);
        assert!((heaviest_chain(&g.forward, "a", 1) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_heaviest_chain_terminates_on_cycles() {
        let g = graph(
            &["a", "b", "c"],
            &[("a", "b", 0.9), ("b", "c", 0.9), ("c", "a", 0.9), ("b", "a", 0.5)],
        );
        // a -> b -> c, then c -> a is blocked by the path
        assert!((heaviest_chain(&g.forward, "a", 5) - 1.8).abs() < 1e-9);
        // b -> c -> a, and a -> b is blocked
        assert!((heaviest_chain(&g.forward, "b", 5) - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_memo_does_not_leak_blocked_paths() {
        // d is reached first via a -> d while b is not on the path, and
        // later from b where b is on the path.
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "d", 0.8), ("a", "b", 0.7), ("b", "d", 0.7), ("d", "b", 0.9), ("b", "c", 0.8)],
        );
        // a -> d -> b -> c = 0.8 + 0.9 + 0.8
        assert!((heaviest_chain(&g.forward, "a", 5) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_bounded_reachability_takes_best_product() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b", 0.5), ("a", "c", 0.9), ("c", "b", 0.9), ("b", "d", 1.0)],
        );
        // b via c: 0.81 beats 0.5 direct; c: 0.9; d via c and b: 0.81
        let reach = bounded_reachability(&g.forward, "a", 5);
        assert!((reach - (0.81 + 0.9 + 0.81)).abs() < 1e-9);

        // with one hop only the direct neighbours count
        let reach = bounded_reachability(&g.forward, "a", 1);
        assert!((reach - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_isolated_node_scores_zero() {
        let g = graph(&["a", "b", "lonely"], &[("a", "b", 0.8)]);
        let scores = SirScorer::new(SirWeights::default(), 5).calculate_sir_scores(&g);

        let lonely = &scores["lonely"];
        assert_eq!(lonely.components, SirComponents::default());
        assert_eq!(lonely.sir, 0.0);
        assert_eq!(lonely.tier, ImpactTier::Low);
        assert_eq!(scores["a"].sir, 1.0);
    }

    #[test]
    fn test_rank_by_sir_breaks_ties_by_id() {
        let g = graph(&["b", "a", "c"], &[("b", "c", 0.8), ("a", "c", 0.8)]);
        let scores = SirScorer::new(SirWeights::default(), 5).calculate_sir_scores(&g);
        let order: Vec<_> = rank_by_sir(&scores)
            .into_iter()
            .map(|s| s.marker_id)
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_impact_tiers() {
        assert_eq!(ImpactTier::from_score(0.7), ImpactTier::High);
        assert_eq!(ImpactTier::from_score(0.45), ImpactTier::Medium);
        assert_eq!(ImpactTier::from_score(0.1), ImpactTier::Low);
    }
}
