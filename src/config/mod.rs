//! Configuration for the satdmap pipeline.
//!
//! [`SatdConfig`] gathers every tunable the stages consume. All fields have
//! defaults, so an empty `.satdmap.toml` (or none at all) yields the
//! documented behavior.

mod loader;
mod scoring;

pub use loader::{
    directory_ancestors, load_config, load_config_from_path, parse_and_validate_config,
    CONFIG_FILE_NAME, MAX_SEARCH_DEPTH,
};
pub use scoring::{
    default_alpha, default_beta, default_commit_window, default_eta1, default_eta2,
    default_eta3, default_eta4, default_gamma, default_lambda, is_valid_weight, validate_weight,
    validate_weight_sum, CaigWeights, CommitConfig, EffortConfig, SirWeights,
    WEIGHT_SUM_TOLERANCE,
};

use crate::errors::{Result, SatdError};
use serde::{Deserialize, Serialize};

/// Hard ceiling for every bounded traversal.
pub const MAX_HOPS_CEILING: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatdConfig {
    /// Bound on call, module, reachability and chain traversals (1..=5)
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    /// Half-width, in lines, of the context window around each marker
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    #[serde(default)]
    pub sir: SirWeights,

    #[serde(default)]
    pub caig: CaigWeights,

    #[serde(default)]
    pub effort: EffortConfig,

    #[serde(default)]
    pub commits: CommitConfig,
}

impl Default for SatdConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            context_window: default_context_window(),
            sir: SirWeights::default(),
            caig: CaigWeights::default(),
            effort: EffortConfig::default(),
            commits: CommitConfig::default(),
        }
    }
}

impl SatdConfig {
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Check every weight set and bound eagerly.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_HOPS_CEILING).contains(&self.max_hops) {
            return Err(SatdError::validation(format!(
                "max_hops must be between 1 and {MAX_HOPS_CEILING}, got {}",
                self.max_hops
            )));
        }

        self.sir.validate().map_err(SatdError::Validation)?;
        self.caig.validate().map_err(SatdError::Validation)?;
        self.effort.validate().map_err(SatdError::Validation)?;
        self.commits.validate().map_err(SatdError::Validation)?;
        Ok(())
    }
}

pub fn default_max_hops() -> usize {
    MAX_HOPS_CEILING
}

pub fn default_context_window() -> usize {
    5
}
