//! Error and diagnostic types for satdmap.
//!
//! Two kinds of failure exist:
//!
//! - [`SatdError`] aborts an operation. Only configuration problems (bad
//!   weights, unreadable or malformed config files) produce one.
//! - [`Diagnostic`] records a condition the pipeline recovered from: a file
//!   that failed to parse, an import that could not be resolved, missing
//!   commit history. Diagnostics are logged where they occur and returned in
//!   the [`AnalysisReport`](crate::pipeline::AnalysisReport) so the caller
//!   can surface them.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SatdError {
    /// Configuration file could not be interpreted
    #[error("Configuration error: {0}")]
    Config(String),

    /// Weights or bounds outside their documented ranges
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SatdError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, SatdError>;

/// A recoverable condition observed while building or scoring the graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The file could not be analyzed and was skipped.
    ParseFailure { file: PathBuf, message: String },
    /// A local import did not map to any analyzed file.
    UnresolvedDependency { file: PathBuf, specifier: String },
    /// No commit history was supplied; commit and effort signals are zero.
    MissingHistory,
    /// No markers were supplied; the report is empty.
    EmptyInput,
    /// A relationship from a marker to itself was discarded.
    SelfRelationship { marker: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ParseFailure { file, message } => {
                write!(f, "skipped {}: {}", file.display(), message)
            }
            Diagnostic::UnresolvedDependency { file, specifier } => {
                write!(f, "unresolved import '{}' in {}", specifier, file.display())
            }
            Diagnostic::MissingHistory => f.write_str("no commit history available"),
            Diagnostic::EmptyInput => f.write_str("no debt markers supplied"),
            Diagnostic::SelfRelationship { marker } => {
                write!(f, "discarded self-relationship on {marker}")
            }
        }
    }
}

/// Sort and deduplicate diagnostics so reports compare equal across runs.
pub fn normalize_diagnostics(mut diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    diagnostics.sort();
    diagnostics.dedup();
    diagnostics
}
