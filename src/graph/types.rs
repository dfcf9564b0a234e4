use crate::core::{DebtMarker, MarkerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of structural link between two markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationType {
    Call,
    Data,
    Module,
}

/// Allowed weight band for one relation type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRange {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

static WEIGHT_RANGES: [(RelationType, WeightRange); 3] = [
    (
        RelationType::Call,
        WeightRange {
            min: 0.7,
            max: 0.9,
            default: 0.8,
        },
    ),
    (
        RelationType::Data,
        WeightRange {
            min: 0.6,
            max: 0.8,
            default: 0.7,
        },
    ),
    (
        RelationType::Module,
        WeightRange {
            min: 0.8,
            max: 1.0,
            default: 0.9,
        },
    ),
];

impl RelationType {
    pub const ALL: [RelationType; 3] = [RelationType::Call, RelationType::Data, RelationType::Module];

    pub fn weight_range(self) -> WeightRange {
        WEIGHT_RANGES[self as usize].1
    }

    /// Weight for a link spanning `hops` steps under a `max_hops` bound.
    ///
    /// One hop gets the top of the band; the weight falls linearly and
    /// reaches the bottom of the band at `max_hops`.
    pub fn weight_for_hops(self, hops: usize, max_hops: usize) -> f64 {
        let range = self.weight_range();
        if hops <= 1 {
            return range.max;
        }
        if max_hops <= 1 {
            return range.min;
        }
        let progress = ((hops - 1) as f64 / (max_hops - 1) as f64).min(1.0);
        range.max - (range.max - range.min) * progress
    }

    pub fn label(self) -> &'static str {
        match self {
            RelationType::Call => "call",
            RelationType::Data => "data",
            RelationType::Module => "module",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A candidate link produced by one extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedEdge {
    pub source: MarkerId,
    pub target: MarkerId,
    pub relation: RelationType,
    /// Always within [0, 1].
    pub weight: f64,
    pub hops: usize,
}

impl WeightedEdge {
    pub fn new(
        source: impl Into<MarkerId>,
        target: impl Into<MarkerId>,
        relation: RelationType,
        weight: f64,
        hops: usize,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation,
            weight: weight.clamp(0.0, 1.0),
            hops,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    pub fn is_direct(&self) -> bool {
        self.hops <= 1
    }
}

/// All typed edges between one ordered `(source, target)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRelationship {
    pub source: MarkerId,
    pub target: MarkerId,
    /// At most one edge per relation type, ordered by type.
    pub edges: Vec<WeightedEdge>,
    /// Maximum weight among `edges`.
    pub strength: f64,
    pub description: String,
    /// Chain the pair belongs to, once chains are known.
    pub chain_id: Option<String>,
}

impl AggregatedRelationship {
    pub fn relation_types(&self) -> Vec<RelationType> {
        self.edges.iter().map(|e| e.relation).collect()
    }

    pub fn has_relation(&self, relation: RelationType) -> bool {
        self.edges.iter().any(|e| e.relation == relation)
    }

    /// Shortest hop count across the contributing edges.
    pub fn hops(&self) -> usize {
        self.edges.iter().map(|e| e.hops).min().unwrap_or(0)
    }
}

/// A maximal weakly-connected group of at least two markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub id: String,
    /// Member ids in ascending order.
    pub nodes: Vec<MarkerId>,
    pub length: usize,
    /// Sum of relationship strengths inside the chain.
    pub total_weight: f64,
    /// Member with the highest SIR, set after scoring.
    pub representative: Option<MarkerId>,
}

impl Chain {
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.binary_search_by(|n| n.as_str().cmp(id)).is_ok()
    }
}

/// One adjacency entry: the neighbor and the relationship strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub node: MarkerId,
    pub weight: f64,
    pub hops: usize,
}

/// The merged relationship graph over every supplied marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SatdGraph {
    /// Markers ordered by id.
    pub nodes: Vec<DebtMarker>,
    /// Surviving typed edges ordered by `(source, target, relation)`.
    pub edges: Vec<WeightedEdge>,
    /// One record per distinct ordered pair, ordered by `(source, target)`.
    pub relationships: Vec<AggregatedRelationship>,
    pub chains: Vec<Chain>,
    /// Outgoing links per node; every node has an entry.
    pub forward: BTreeMap<MarkerId, Vec<Link>>,
    /// Incoming links per node; every node has an entry.
    pub reverse: BTreeMap<MarkerId, Vec<Link>>,
}

impl SatdGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&DebtMarker> {
        self.nodes
            .binary_search_by(|n| n.id.as_str().cmp(id))
            .ok()
            .map(|idx| &self.nodes[idx])
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &MarkerId> {
        self.nodes.iter().map(|n| &n.id)
    }

    pub fn outgoing(&self, id: &str) -> &[Link] {
        self.forward.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn incoming(&self, id: &str) -> &[Link] {
        self.reverse.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, id: &str) -> usize {
        self.outgoing(id).len() + self.incoming(id).len()
    }

    pub fn relationship(&self, source: &str, target: &str) -> Option<&AggregatedRelationship> {
        self.relationships
            .binary_search_by(|r| (r.source.as_str(), r.target.as_str()).cmp(&(source, target)))
            .ok()
            .map(|idx| &self.relationships[idx])
    }

    pub fn chain_of(&self, id: &str) -> Option<&Chain> {
        self.chains.iter().find(|chain| chain.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_ranges_lookup() {
        let call = RelationType::Call.weight_range();
        assert_eq!((call.min, call.max, call.default), (0.7, 0.9, 0.8));
        let data = RelationType::Data.weight_range();
        assert_eq!((data.min, data.max, data.default), (0.6, 0.8, 0.7));
        let module = RelationType::Module.weight_range();
        assert_eq!((module.min, module.max, module.default), (0.8, 1.0, 0.9));
    }

    #[test]
    fn test_weight_for_hops_interpolates() {
        assert_eq!(RelationType::Call.weight_for_hops(1, 5), 0.9);
        assert!((RelationType::Call.weight_for_hops(3, 5) - 0.8).abs() < 1e-9);
        assert!((RelationType::Call.weight_for_hops(5, 5) - 0.7).abs() < 1e-9);
        assert!((RelationType::Module.weight_for_hops(9, 5) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_edge_weight_clamped() {
        let edge = WeightedEdge::new("a", "b", RelationType::Call, 1.7, 1);
        assert_eq!(edge.weight, 1.0);
        assert!(!edge.is_self_loop());
        assert!(edge.is_direct());
    }
}
