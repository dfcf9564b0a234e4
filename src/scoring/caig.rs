//! Commit-aware final ranking.
//!
//! `Rank = eta1 * SIR + eta2 * CommitRel + eta3 * (1 - Effort) + eta4 * FixPotential`.
//! Low historical effort raises the third term, so cheap fixes float up.

use super::commit::{commit_relevance, recent_commits, CommitRecord};
use super::effort::{EffortEstimate, EffortScorer};
use super::history::HistoryIndex;
use super::sir::{ImpactTier, SirComponents, SirScore};
use crate::config::{CaigWeights, SatdConfig};
use crate::core::{DebtMarker, MarkerId, SourceMap};
use crate::errors::Diagnostic;
use crate::graph::SatdGraph;
use serde::Serialize;
use std::collections::BTreeMap;

/// Pure function: Blend the four priority signals
///
/// Weights are used as given; their sum is checked by
/// [`CaigWeights::validate`], not here.
pub fn caig_rank(
    sir: f64,
    commit_relevance: f64,
    effort: f64,
    fix_potential: f64,
    weights: &CaigWeights,
) -> f64 {
    weights.eta1 * sir
        + weights.eta2 * commit_relevance
        + weights.eta3 * (1.0 - effort)
        + weights.eta4 * fix_potential
}

/// A marker with every score computed for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMarker {
    pub marker: DebtMarker,
    pub sir: f64,
    pub components: SirComponents,
    pub tier: ImpactTier,
    pub commit_relevance: f64,
    pub effort: EffortEstimate,
    pub fix_potential: f64,
    /// Final priority; higher means fix sooner.
    pub rank: f64,
    pub chain_id: Option<String>,
}

impl RankedMarker {
    pub fn id(&self) -> &str {
        &self.marker.id
    }
}

pub struct CaigRanker<'a> {
    config: &'a SatdConfig,
}

impl<'a> CaigRanker<'a> {
    pub fn new(config: &'a SatdConfig) -> Self {
        Self { config }
    }

    /// Rank every graph node, highest priority first.
    ///
    /// Nodes missing from `sir_scores` are ranked with a zero SIR.
    pub fn rank(
        &self,
        graph: &SatdGraph,
        sir_scores: &BTreeMap<MarkerId, SirScore>,
        sources: &SourceMap,
        commits: &[CommitRecord],
    ) -> (Vec<RankedMarker>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        if commits.is_empty() && !graph.is_empty() {
            log::debug!("No commit history supplied; commit relevance and effort are zero");
            diagnostics.push(Diagnostic::MissingHistory);
        }

        let window = recent_commits(commits, self.config.commits.window);
        let history = HistoryIndex::from_commits(commits);
        let efforts = EffortScorer::new(&self.config.effort, self.config.context_window)
            .score_all(&graph.nodes, sources, &history);

        let mut ranked: Vec<RankedMarker> = graph
            .nodes
            .iter()
            .map(|marker| {
                let (sir, components, tier) = sir_scores
                    .get(&marker.id)
                    .map(|s| (s.sir, s.components, s.tier))
                    .unwrap_or((0.0, SirComponents::default(), ImpactTier::Low));
                let relevance = commit_relevance(&marker.file, &window, &self.config.commits);
                let effort = efforts.get(&marker.id).copied().unwrap_or_default();
                let fix_potential = marker.fix_potential_value();

                RankedMarker {
                    marker: marker.clone(),
                    sir,
                    components,
                    tier,
                    commit_relevance: relevance,
                    effort,
                    fix_potential,
                    rank: caig_rank(sir, relevance, effort.score, fix_potential, &self.config.caig),
                    chain_id: graph.chain_of(&marker.id).map(|c| c.id.clone()),
                }
            })
            .collect();

        sort_by_rank(&mut ranked);
        (ranked, diagnostics)
    }
}

/// Descending rank; equal ranks fall back to marker id.
pub fn sort_by_rank(ranked: &mut [RankedMarker]) {
    ranked.sort_by(|a, b| {
        b.rank
            .total_cmp(&a.rank)
            .then_with(|| a.marker.id.cmp(&b.marker.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FixPotential;
    use crate::graph::{RelationType, WeightedEdge};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_caig_rank_blend() {
        let rank = caig_rank(0.8, 0.6, 0.3, 0.5, &CaigWeights::default());
        assert!((rank - 0.68).abs() < 1e-9);
    }

    #[test]
    fn test_lower_effort_ranks_higher() {
        let weights = CaigWeights::default();
        let cheap = caig_rank(0.5, 0.5, 0.1, 0.5, &weights);
        let costly = caig_rank(0.5, 0.5, 0.9, 0.5, &weights);
        assert!(cheap > costly);
    }

    #[test]
    fn test_rank_without_history() {
        let config = SatdConfig::default();
        let markers = vec![
            DebtMarker::new("a", "a.py", 1, "TODO").with_fix_potential(FixPotential::High),
            DebtMarker::new("b", "b.py", 1, "TODO"),
        ];
        let graph = SatdGraph::build(&markers, vec![]);

        let (ranked, diagnostics) =
            CaigRanker::new(&config).rank(&graph, &BTreeMap::new(), &SourceMap::new(), &[]);

        assert_eq!(diagnostics, vec![Diagnostic::MissingHistory]);
        assert_eq!(ranked[0].id(), "a");
        // zero effort inverts to the full eta3 term
        assert!((ranked[1].rank - 0.15).abs() < 1e-9);
        assert!((ranked[0].rank - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_ties_break_by_id() {
        let config = SatdConfig::default();
        let markers = vec![
            DebtMarker::new("z", "z.py", 1, "TODO"),
            DebtMarker::new("m", "m.py", 1, "TODO"),
        ];
        let graph = SatdGraph::build(&markers, vec![]);
        let (ranked, _) =
            CaigRanker::new(&config).rank(&graph, &BTreeMap::new(), &SourceMap::new(), &[]);
        let ids: Vec<_> = ranked.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["m", "z"]);
    }

    #[test]
    fn test_recent_commits_raise_rank() {
        let config = SatdConfig::default();
        let markers = vec![
            DebtMarker::new("touched", "pkg/a.py", 1, "TODO"),
            DebtMarker::new("quiet", "other/b.py", 1, "TODO"),
        ];
        let edges = vec![WeightedEdge::new("touched", "quiet", RelationType::Module, 0.7, 1)];
        let graph = SatdGraph::build(&markers, edges);
        let commits = vec![CommitRecord::new(
            "c1",
            ["pkg/a.py"],
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        )];

        let (ranked, diagnostics) =
            CaigRanker::new(&config).rank(&graph, &BTreeMap::new(), &SourceMap::new(), &commits);
        assert!(diagnostics.is_empty());
        let touched = ranked.iter().find(|r| r.id() == "touched").unwrap();
        let quiet = ranked.iter().find(|r| r.id() == "quiet").unwrap();
        assert!((touched.commit_relevance - 0.1).abs() < 1e-9);
        assert_eq!(quiet.commit_relevance, 0.0);
        assert_eq!(touched.chain_id.as_deref(), Some("chain-1"));
    }
}
