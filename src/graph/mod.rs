//! The SATD relationship graph.
//!
//! Candidate edges from the extractors are merged into one
//! [`AggregatedRelationship`] per ordered marker pair, adjacency maps are
//! built over every marker, and the graph is split into weakly-connected
//! [`Chain`]s. Construction is deterministic: the same node and edge sets
//! always produce the same graph, whatever order they arrive in.

pub mod aggregate;
pub mod chains;
pub mod types;

pub use aggregate::{aggregate_edges, Aggregation};
pub use chains::{annotate_relationships, assign_representatives, find_chains, ChainMetrics};
pub use types::{
    AggregatedRelationship, Chain, Link, RelationType, SatdGraph, WeightRange, WeightedEdge,
};
