//! Merge candidate edges into the relationship graph.
//!
//! Extractors may link the same ordered pair more than once (a call and a
//! module import between the same two markers, or the same relation reached
//! along several paths). Aggregation keeps the strongest edge per relation
//! type, folds the pair into one [`AggregatedRelationship`], and builds the
//! adjacency maps over the full node set.

use super::chains::{annotate_relationships, find_chains};
use super::types::{AggregatedRelationship, Link, RelationType, SatdGraph, WeightedEdge};
use crate::core::{DebtMarker, MarkerId};
use crate::errors::Diagnostic;
use std::collections::{BTreeMap, BTreeSet};

/// Result of folding candidate edges by `(source, target)`.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub relationships: Vec<AggregatedRelationship>,
    pub edges: Vec<WeightedEdge>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Group edges by ordered pair, discarding self-relationships.
pub fn aggregate_edges(edges: impl IntoIterator<Item = WeightedEdge>) -> Aggregation {
    let mut pairs: BTreeMap<(MarkerId, MarkerId), BTreeMap<RelationType, WeightedEdge>> =
        BTreeMap::new();
    let mut diagnostics = Vec::new();

    for edge in edges {
        if edge.is_self_loop() {
            log::debug!("Dropping self-relationship on {}", edge.source);
            diagnostics.push(Diagnostic::SelfRelationship {
                marker: edge.source.clone(),
            });
            continue;
        }

        let by_type = pairs
            .entry((edge.source.clone(), edge.target.clone()))
            .or_default();
        match by_type.get(&edge.relation) {
            Some(existing) if !is_stronger(&edge, existing) => {}
            _ => {
                by_type.insert(edge.relation, edge);
            }
        }
    }

    let mut relationships = Vec::with_capacity(pairs.len());
    let mut kept_edges = Vec::new();
    for ((source, target), by_type) in pairs {
        let edges: Vec<WeightedEdge> = by_type.into_values().collect();
        let strength = edges.iter().map(|e| e.weight).fold(0.0, f64::max);
        kept_edges.extend(edges.iter().cloned());
        relationships.push(AggregatedRelationship {
            description: describe(&edges),
            source,
            target,
            edges,
            strength,
            chain_id: None,
        });
    }

    Aggregation {
        relationships,
        edges: kept_edges,
        diagnostics,
    }
}

fn is_stronger(candidate: &WeightedEdge, existing: &WeightedEdge) -> bool {
    candidate.weight > existing.weight
        || (candidate.weight == existing.weight && candidate.hops < existing.hops)
}

/// `call dependency (1 hop); module dependency (2 hops)`
fn describe(edges: &[WeightedEdge]) -> String {
    edges
        .iter()
        .map(|edge| {
            let unit = if edge.hops == 1 { "hop" } else { "hops" };
            format!("{} dependency ({} {})", edge.relation, edge.hops, unit)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl SatdGraph {
    /// Build the graph from markers and candidate edges.
    pub fn build(markers: &[DebtMarker], edges: Vec<WeightedEdge>) -> Self {
        Self::build_with_diagnostics(markers, edges).0
    }

    /// Build the graph, also returning the conditions hit along the way.
    ///
    /// The result depends only on the marker and edge *sets*: nodes,
    /// relationships, adjacency lists and chains are all ordered by id.
    pub fn build_with_diagnostics(
        markers: &[DebtMarker],
        edges: Vec<WeightedEdge>,
    ) -> (Self, Vec<Diagnostic>) {
        let nodes = unique_nodes(markers);
        let known: BTreeSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

        let (edges, dangling): (Vec<_>, Vec<_>) = edges.into_iter().partition(|edge| {
            known.contains(edge.source.as_str()) && known.contains(edge.target.as_str())
        });
        for edge in &dangling {
            log::warn!(
                "Ignoring edge {} -> {} with an unknown endpoint",
                edge.source,
                edge.target
            );
        }

        let Aggregation {
            mut relationships,
            edges,
            diagnostics,
        } = aggregate_edges(edges);

        let (forward, reverse) = adjacency(&nodes, &relationships);
        let node_ids: Vec<MarkerId> = nodes.iter().map(|n| n.id.clone()).collect();
        let chains = find_chains(&node_ids, &relationships);
        annotate_relationships(&mut relationships, &chains);

        log::debug!(
            "Built SATD graph: {} nodes, {} relationships, {} chains",
            nodes.len(),
            relationships.len(),
            chains.len()
        );

        let graph = SatdGraph {
            nodes,
            edges,
            relationships,
            chains,
            forward,
            reverse,
        };
        (graph, diagnostics)
    }
}

fn unique_nodes(markers: &[DebtMarker]) -> Vec<DebtMarker> {
    let mut nodes = markers.to_vec();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    let before = nodes.len();
    nodes.dedup_by(|later, earlier| later.id == earlier.id);
    if nodes.len() != before {
        log::warn!(
            "Ignoring {} markers with duplicate ids",
            before - nodes.len()
        );
    }
    nodes
}

type AdjacencyMap = BTreeMap<MarkerId, Vec<Link>>;

fn adjacency(
    nodes: &[DebtMarker],
    relationships: &[AggregatedRelationship],
) -> (AdjacencyMap, AdjacencyMap) {
    let mut forward: AdjacencyMap = nodes.iter().map(|n| (n.id.clone(), Vec::new())).collect();
    let mut reverse = forward.clone();

    // relationships are sorted by (source, target), so every list comes out sorted
    for rel in relationships {
        let hops = rel.hops();
        if let Some(out) = forward.get_mut(&rel.source) {
            out.push(Link {
                node: rel.target.clone(),
                weight: rel.strength,
                hops,
            });
        }
        if let Some(incoming) = reverse.get_mut(&rel.target) {
            incoming.push(Link {
                node: rel.source.clone(),
                weight: rel.strength,
                hops,
            });
        }
    }
    for links in reverse.values_mut() {
        links.sort_by(|a, b| a.node.cmp(&b.node));
    }

    (forward, reverse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(id: &str) -> DebtMarker {
        DebtMarker::new(id, format!("{id}.py"), 1, "TODO")
    }

    #[test]
    fn test_aggregate_keeps_strongest_edge_per_type() {
        let aggregation = aggregate_edges(vec![
            WeightedEdge::new("a", "b", RelationType::Call, 0.75, 3),
            WeightedEdge::new("a", "b", RelationType::Call, 0.9, 1),
            WeightedEdge::new("a", "b", RelationType::Module, 0.85, 2),
        ]);

        assert_eq!(aggregation.relationships.len(), 1);
        let rel = &aggregation.relationships[0];
        assert_eq!(rel.edges.len(), 2);
        assert_eq!(rel.strength, 0.9);
        assert_eq!(
            rel.description,
            "call dependency (1 hop); module dependency (2 hops)"
        );
        assert_eq!(aggregation.edges.len(), 2);
    }

    #[test]
    fn test_aggregate_drops_self_relationships() {
        let aggregation = aggregate_edges(vec![
            WeightedEdge::new("a", "a", RelationType::Call, 0.9, 1),
            WeightedEdge::new("a", "b", RelationType::Data, 0.8, 1),
        ]);

        assert_eq!(aggregation.relationships.len(), 1);
        assert_eq!(
            aggregation.diagnostics,
            vec![Diagnostic::SelfRelationship { marker: "a".into() }]
        );
    }

    #[test]
    fn test_build_ignores_unknown_endpoints_and_duplicate_ids() {
        let markers = vec![marker("b"), marker("a"), marker("a")];
        let graph = SatdGraph::build(
            &markers,
            vec![
                WeightedEdge::new("a", "b", RelationType::Call, 0.9, 1),
                WeightedEdge::new("a", "ghost", RelationType::Call, 0.9, 1),
            ],
        );

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.relationships.len(), 1);
        assert_eq!(graph.outgoing("a").len(), 1);
        assert_eq!(graph.incoming("b")[0].node, "a");
        assert!(graph.outgoing("b").is_empty());
    }

    #[test]
    fn test_adjacency_covers_isolated_nodes() {
        let markers = vec![marker("a"), marker("b"), marker("lonely")];
        let graph = SatdGraph::build(
            &markers,
            vec![WeightedEdge::new("a", "b", RelationType::Module, 1.0, 1)],
        );

        assert!(graph.forward.contains_key("lonely"));
        assert!(graph.reverse.contains_key("lonely"));
        assert_eq!(graph.degree("lonely"), 0);
        assert!(graph.chain_of("lonely").is_none());
    }
}
