//! Weakly-connected decomposition of the relationship graph.

use super::types::{AggregatedRelationship, Chain};
use crate::core::{paths::parent_dir, DebtMarker, MarkerId};
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Group nodes into chains, treating every relationship as undirected.
///
/// `node_ids` must be sorted and unique. Components with fewer than two
/// members are dropped, so an isolated marker never forms a chain. Chains
/// come back ordered by descending length, then by their smallest member,
/// and are numbered `chain-1`, `chain-2`, ... in that order.
pub fn find_chains(node_ids: &[MarkerId], relationships: &[AggregatedRelationship]) -> Vec<Chain> {
    let index_of = |id: &str| node_ids.binary_search_by(|n| n.as_str().cmp(id)).ok();

    let mut components = UnionFind::<usize>::new(node_ids.len());
    for rel in relationships {
        if let (Some(a), Some(b)) = (index_of(&rel.source), index_of(&rel.target)) {
            components.union(a, b);
        }
    }

    let labels = components.into_labeling();
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, label) in labels.iter().enumerate() {
        groups.entry(*label).or_default().push(idx);
    }

    let mut weights: BTreeMap<usize, f64> = BTreeMap::new();
    for rel in relationships {
        if let Some(a) = index_of(&rel.source) {
            *weights.entry(labels[a]).or_default() += rel.strength;
        }
    }

    let mut chains: Vec<Chain> = groups
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(label, members)| Chain {
            id: String::new(),
            length: members.len(),
            nodes: members.into_iter().map(|idx| node_ids[idx].clone()).collect(),
            total_weight: weights.get(&label).copied().unwrap_or(0.0),
            representative: None,
        })
        .collect();

    chains.sort_by(|a, b| {
        b.length
            .cmp(&a.length)
            .then_with(|| a.nodes.first().cmp(&b.nodes.first()))
    });
    for (i, chain) in chains.iter_mut().enumerate() {
        chain.id = format!("chain-{}", i + 1);
    }
    chains
}

/// Record on each relationship the id of the chain that contains it.
pub fn annotate_relationships(relationships: &mut [AggregatedRelationship], chains: &[Chain]) {
    let chain_of: BTreeMap<&str, &str> = chains
        .iter()
        .flat_map(|chain| chain.nodes.iter().map(move |id| (id.as_str(), chain.id.as_str())))
        .collect();
    for rel in relationships.iter_mut() {
        rel.chain_id = chain_of.get(rel.source.as_str()).map(|id| id.to_string());
    }
}

/// Pick each chain's representative: the member with the highest score,
/// ties going to the smallest id.
pub fn assign_representatives<F>(chains: &mut [Chain], score: F)
where
    F: Fn(&str) -> f64,
{
    for chain in chains.iter_mut() {
        // members are sorted, so keeping the first maximum breaks ties by id
        let mut best: Option<(&MarkerId, f64)> = None;
        for member in &chain.nodes {
            let value = score(member);
            if best.is_none_or(|(_, top)| value > top) {
                best = Some((member, value));
            }
        }
        chain.representative = best.map(|(id, _)| id.clone());
    }
}

/// Summary statistics over the chain decomposition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainMetrics {
    pub chain_count: usize,
    pub average_length: f64,
    pub max_length: usize,
    /// Share of all markers that sit in some chain.
    pub participation_rate: f64,
    /// Share of chains whose members live in more than one directory.
    pub cross_module_rate: f64,
}

impl ChainMetrics {
    pub fn compute(chains: &[Chain], nodes: &[DebtMarker]) -> Self {
        if chains.is_empty() {
            return Self::default();
        }

        let directories: BTreeMap<&str, &std::path::Path> = nodes
            .iter()
            .map(|n| (n.id.as_str(), parent_dir(&n.file)))
            .collect();

        let in_chains: usize = chains.iter().map(|c| c.length).sum();
        let max_length = chains.iter().map(|c| c.length).max().unwrap_or(0);
        let cross_module = chains
            .iter()
            .filter(|chain| {
                let dirs: BTreeSet<_> = chain
                    .nodes
                    .iter()
                    .filter_map(|id| directories.get(id.as_str()))
                    .collect();
                dirs.len() > 1
            })
            .count();

        Self {
            chain_count: chains.len(),
            average_length: in_chains as f64 / chains.len() as f64,
            max_length,
            participation_rate: if nodes.is_empty() {
                0.0
            } else {
                in_chains as f64 / nodes.len() as f64
            },
            cross_module_rate: cross_module as f64 / chains.len() as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::{RelationType, WeightedEdge};

    fn rel(source: &str, target: &str, strength: f64) -> AggregatedRelationship {
        AggregatedRelationship {
            source: source.into(),
            target: target.into(),
            edges: vec![WeightedEdge::new(source, target, RelationType::Call, strength, 1)],
            strength,
            description: String::new(),
            chain_id: None,
        }
    }

    fn ids(names: &[&str]) -> Vec<MarkerId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_chains_orders_by_length() {
        let nodes = ids(&["a", "b", "c", "d", "e", "f"]);
        let rels = vec![rel("a", "b", 0.8), rel("e", "d", 0.7), rel("d", "c", 0.9)];

        let chains = find_chains(&nodes, &rels);

        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].id, "chain-1");
        assert_eq!(chains[0].nodes, ids(&["c", "d", "e"]));
        assert!((chains[0].total_weight - 1.6).abs() < 1e-9);
        assert_eq!(chains[1].nodes, ids(&["a", "b"]));
        assert!(chains.iter().all(|c| !c.contains("f")));
    }

    #[test]
    fn test_find_chains_ignores_direction() {
        let nodes = ids(&["a", "b", "c"]);
        let rels = vec![rel("a", "b", 0.8), rel("c", "b", 0.8)];

        let chains = find_chains(&nodes, &rels);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].length, 3);
    }

    #[test]
    fn test_annotate_and_representatives() {
        let nodes = ids(&["a", "b", "c"]);
        let mut rels = vec![rel("a", "b", 0.8), rel("b", "c", 0.8)];
        let mut chains = find_chains(&nodes, &rels);

        annotate_relationships(&mut rels, &chains);
        assert!(rels.iter().all(|r| r.chain_id.as_deref() == Some("chain-1")));

        assign_representatives(&mut chains, |id| if id == "a" { 0.2 } else { 0.5 });
        assert_eq!(chains[0].representative.as_deref(), Some("b"));
    }

    #[test]
    fn test_annotate_separates_chains() {
        let nodes = ids(&["a", "b", "c", "d", "e"]);
        let mut rels = vec![rel("a", "b", 0.8), rel("d", "c", 0.8), rel("e", "d", 0.8)];
        let chains = find_chains(&nodes, &rels);

        annotate_relationships(&mut rels, &chains);
        let labels: Vec<_> = rels.iter().map(|r| r.chain_id.as_deref()).collect();
        assert_eq!(labels, vec![Some("chain-2"), Some("chain-1"), Some("chain-1")]);
    }

    #[test]
    fn test_chain_metrics() {
        let markers = vec![
            DebtMarker::new("a", "pkg/x.py", 1, "TODO"),
            DebtMarker::new("b", "pkg/y.py", 1, "TODO"),
            DebtMarker::new("c", "web/z.js", 1, "TODO"),
            DebtMarker::new("d", "web/w.js", 1, "TODO"),
            DebtMarker::new("e", "lone.rs", 1, "TODO"),
        ];
        let nodes = ids(&["a", "b", "c", "d", "e"]);
        let rels = vec![rel("a", "b", 0.8), rel("b", "c", 0.8)];
        let chains = find_chains(&nodes, &rels);

        let metrics = ChainMetrics::compute(&chains, &markers);
        assert_eq!(metrics.chain_count, 1);
        assert_eq!(metrics.max_length, 3);
        assert!((metrics.participation_rate - 0.6).abs() < 1e-9);
        assert_eq!(metrics.cross_module_rate, 1.0);
    }

    #[test]
    fn test_chain_metrics_empty() {
        assert_eq!(ChainMetrics::compute(&[], &[]), ChainMetrics::default());
    }
}
