//! Structural relationship graph and prioritization for self-admitted
//! technical debt (SATD).
//!
//! Given debt markers found by an external detector, the sources they live
//! in and the repository's commit history, satdmap links markers through
//! call, data and module relationships, decomposes the result into chains,
//! scores each marker's impact ripple (SIR) and produces a commit-aware
//! remediation ranking.
//!
//! ```no_run
//! use satdmap::{analyze, DebtMarker, SatdConfig, SourceMap};
//!
//! let markers = vec![DebtMarker::new("m1", "src/app.py", 12, "TODO: handle retries")];
//! let sources = SourceMap::new();
//! let report = analyze(&markers, &sources, &[], &SatdConfig::default())?;
//! for ranked in report.top(10) {
//!     println!("{} {:.3}", ranked.marker.id, ranked.rank);
//! }
//! # Ok::<(), satdmap::SatdError>(())
//! ```

pub mod config;
pub mod core;
pub mod errors;
pub mod extraction;
pub mod graph;
pub mod pipeline;
pub mod scoring;

// Re-export commonly used types
pub use crate::config::{
    load_config, CaigWeights, CommitConfig, EffortConfig, SatdConfig, SirWeights,
};
pub use crate::core::{DebtMarker, DebtType, FixPotential, Language, MarkerId, SourceMap};
pub use crate::errors::{Diagnostic, Result, SatdError};
pub use crate::extraction::extract_relationships;
pub use crate::graph::{
    AggregatedRelationship, Chain, ChainMetrics, RelationType, SatdGraph, WeightedEdge,
};
pub use crate::pipeline::{analyze, AnalysisReport};
pub use crate::scoring::{
    caig_rank, rank_by_sir, CommitRecord, EffortEstimate, ImpactTier, RankedMarker, SirComponents,
    SirScore, SirScorer,
};
