//! Scoring configuration for SATD prioritization
//!
//! This module contains the weight sets and heuristic constants used by the
//! scoring stages:
//! - SIR weights (fanout, chain length, reachability)
//! - CAIG weights (SIR, commit relevance, inverted effort, fix potential)
//! - Effort heuristic constants
//! - Commit window and relevance contributions

use serde::{Deserialize, Serialize};

/// Tolerance used when checking that a weight set sums to 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

// Pure function: Check if a weight is in valid range
pub fn is_valid_weight(weight: f64) -> bool {
    (0.0..=1.0).contains(&weight)
}

// Pure function: Validate a single weight with name
pub fn validate_weight(weight: f64, name: &str) -> Result<(), String> {
    if is_valid_weight(weight) {
        Ok(())
    } else {
        Err(format!("{name} weight must be between 0.0 and 1.0, got {weight}"))
    }
}

// Pure function: Validate a weight set sums to 1.0
pub fn validate_weight_sum(weights: &[f64], set_name: &str) -> Result<(), String> {
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        Err(format!(
            "{set_name} weights must sum to 1.0, but sum to {sum:.3}"
        ))
    } else {
        Ok(())
    }
}

/// Weights of the three SIR components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SirWeights {
    /// Weight for weighted fanout (0.0-1.0)
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Weight for heaviest chain length (0.0-1.0)
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// Weight for bounded reachability (0.0-1.0)
    #[serde(default = "default_gamma")]
    pub gamma: f64,
}

impl Default for SirWeights {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            beta: default_beta(),
            gamma: default_gamma(),
        }
    }
}

impl SirWeights {
    pub fn validate(&self) -> Result<(), String> {
        validate_weight(self.alpha, "SIR alpha")?;
        validate_weight(self.beta, "SIR beta")?;
        validate_weight(self.gamma, "SIR gamma")?;
        validate_weight_sum(&[self.alpha, self.beta, self.gamma], "SIR")
    }
}

pub fn default_alpha() -> f64 {
    0.4
}
pub fn default_beta() -> f64 {
    0.3
}
pub fn default_gamma() -> f64 {
    0.3
}

/// Weights of the final commit-aware rank.
///
/// The four weights are expected to sum to 1.0. [`CaigWeights::validate`]
/// checks it; the ranking formula itself does not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaigWeights {
    /// Weight for the SIR score
    #[serde(default = "default_eta1")]
    pub eta1: f64,

    /// Weight for commit relevance
    #[serde(default = "default_eta2")]
    pub eta2: f64,

    /// Weight for inverted effort (cheap wins rank higher)
    #[serde(default = "default_eta3")]
    pub eta3: f64,

    /// Weight for the external fix-potential label
    #[serde(default = "default_eta4")]
    pub eta4: f64,
}

impl Default for CaigWeights {
    fn default() -> Self {
        Self {
            eta1: default_eta1(),
            eta2: default_eta2(),
            eta3: default_eta3(),
            eta4: default_eta4(),
        }
    }
}

impl CaigWeights {
    pub fn sum(&self) -> f64 {
        self.eta1 + self.eta2 + self.eta3 + self.eta4
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_weight(self.eta1, "CAIG eta1")?;
        validate_weight(self.eta2, "CAIG eta2")?;
        validate_weight(self.eta3, "CAIG eta3")?;
        validate_weight(self.eta4, "CAIG eta4")?;
        validate_weight_sum(&[self.eta1, self.eta2, self.eta3, self.eta4], "CAIG")
    }
}

pub fn default_eta1() -> f64 {
    0.4
}
pub fn default_eta2() -> f64 {
    0.3
}
pub fn default_eta3() -> f64 {
    0.15
}
pub fn default_eta4() -> f64 {
    0.15
}

/// Effort heuristic: `S = lambda * RT/maxRT + (1 - lambda) * FM/maxFM`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffortConfig {
    /// Balance between estimated resolution time and modification count
    #[serde(default = "default_lambda")]
    pub lambda: f64,

    /// Files touched more often than this are familiar territory
    #[serde(default = "default_high_churn_threshold")]
    pub high_churn_threshold: usize,

    /// Multiplier applied to resolution time in high-churn files
    #[serde(default = "default_familiarity_discount")]
    pub familiarity_discount: f64,

    /// Multiplier applied when the file is older than a year
    #[serde(default = "default_aging_penalty")]
    pub aging_penalty: f64,

    /// Files with more distinct authors than this pay the contributor penalty
    #[serde(default = "default_contributor_threshold")]
    pub contributor_threshold: usize,

    #[serde(default = "default_contributor_penalty")]
    pub contributor_penalty: f64,
}

impl Default for EffortConfig {
    fn default() -> Self {
        Self {
            lambda: default_lambda(),
            high_churn_threshold: default_high_churn_threshold(),
            familiarity_discount: default_familiarity_discount(),
            aging_penalty: default_aging_penalty(),
            contributor_threshold: default_contributor_threshold(),
            contributor_penalty: default_contributor_penalty(),
        }
    }
}

impl EffortConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_weight(self.lambda, "Effort lambda")?;
        if self.familiarity_discount <= 0.0
            || self.aging_penalty <= 0.0
            || self.contributor_penalty <= 0.0
        {
            return Err("Effort multipliers must be positive".to_string());
        }
        Ok(())
    }
}

pub fn default_lambda() -> f64 {
    0.5
}
pub fn default_high_churn_threshold() -> usize {
    20
}
pub fn default_familiarity_discount() -> f64 {
    0.8
}
pub fn default_aging_penalty() -> f64 {
    1.2
}
pub fn default_contributor_threshold() -> usize {
    5
}
pub fn default_contributor_penalty() -> f64 {
    1.15
}

/// Sliding commit window and per-commit relevance contributions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommitConfig {
    /// Number of most recent commits considered
    #[serde(default = "default_commit_window")]
    pub window: usize,

    /// Contribution of a commit that modified the marker's file
    #[serde(default = "default_direct_weight")]
    pub direct_weight: f64,

    /// Contribution of a commit that modified a sibling file
    #[serde(default = "default_same_directory_weight")]
    pub same_directory_weight: f64,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            window: default_commit_window(),
            direct_weight: default_direct_weight(),
            same_directory_weight: default_same_directory_weight(),
        }
    }
}

impl CommitConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.window == 0 {
            return Err("Commit window must be at least 1".to_string());
        }
        validate_weight(self.direct_weight, "Direct commit")?;
        validate_weight(self.same_directory_weight, "Same-directory commit")?;
        if self.same_directory_weight > self.direct_weight {
            return Err(
                "Same-directory commit weight must not exceed the direct commit weight"
                    .to_string(),
            );
        }
        Ok(())
    }
}

pub fn default_commit_window() -> usize {
    50
}
pub fn default_direct_weight() -> f64 {
    0.1
}
pub fn default_same_directory_weight() -> f64 {
    0.03
}
