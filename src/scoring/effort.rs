//! Historical effort estimate per marker.
//!
//! `S = lambda * RT / maxRT + (1 - lambda) * FM / maxFM`, where `FM` is the
//! number of commits that touched the marker's file and `RT` a heuristic
//! resolution cost. Both maxima are taken over the full marker set and
//! floored at 1.

use super::history::{FileHistory, HistoryIndex};
use crate::config::EffortConfig;
use crate::core::paths::normalize_path;
use crate::core::{DebtMarker, DebtType, MarkerId, SourceMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Files older than this pay the aging penalty.
pub const AGE_THRESHOLD_DAYS: i64 = 365;

/// Characters of marker text at which the length factor reaches `1 + ln 2`.
const LENGTH_SCALE: f64 = 40.0;

/// Base resolution cost per debt type, in arbitrary units.
pub fn base_cost(debt_type: Option<DebtType>) -> f64 {
    match debt_type {
        Some(DebtType::Architecture) => 8.0,
        Some(DebtType::Design) => 6.0,
        Some(DebtType::Defect) => 5.0,
        Some(DebtType::Algorithm) | Some(DebtType::Requirement) => 4.0,
        Some(DebtType::Build) => 3.5,
        Some(DebtType::Test) => 3.0,
        Some(DebtType::Documentation) => 1.0,
        None => 4.0,
    }
}

/// Diminishing-returns factor for the amount of text around a marker.
pub fn length_factor(chars: usize) -> f64 {
    1.0 + (1.0 + chars as f64 / LENGTH_SCALE).ln()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EffortEstimate {
    /// Raw estimated resolution time (RT)
    pub resolution_time: f64,
    /// Raw file modification count (FM)
    pub modifications: usize,
    /// Normalized effort score in [0, 1]
    pub score: f64,
}

pub struct EffortScorer<'a> {
    config: &'a EffortConfig,
    context_window: usize,
}

impl<'a> EffortScorer<'a> {
    pub fn new(config: &'a EffortConfig, context_window: usize) -> Self {
        Self {
            config,
            context_window,
        }
    }

    /// Characters in the marker text plus the surrounding context lines.
    pub fn context_length(&self, marker: &DebtMarker, text: Option<&str>) -> usize {
        let content = marker.content.chars().count();
        let Some(text) = text else {
            return content;
        };
        let first = marker.line.saturating_sub(self.context_window).max(1);
        let last = marker.line + self.context_window;
        let context: usize = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line))
            .filter(|(line_no, _)| (first..=last).contains(line_no) && *line_no != marker.line)
            .map(|(_, line)| line.trim().chars().count())
            .sum();
        content + context
    }

    /// Pure function: Estimate resolution time from debt type, text length
    /// and file-level modifiers
    pub fn resolution_time(
        &self,
        marker: &DebtMarker,
        context_length: usize,
        history: Option<&FileHistory>,
        now: Option<DateTime<Utc>>,
    ) -> f64 {
        let mut estimate = base_cost(marker.debt_type) * length_factor(context_length);

        if let Some(history) = history {
            if history.modifications > self.config.high_churn_threshold {
                estimate *= self.config.familiarity_discount;
            }
            if now.is_some_and(|now| history.age_days(now) > AGE_THRESHOLD_DAYS) {
                estimate *= self.config.aging_penalty;
            }
            if history.author_count() > self.config.contributor_threshold {
                estimate *= self.config.contributor_penalty;
            }
        }
        estimate
    }

    /// Effort estimates for every marker.
    ///
    /// Without any commit history there is no effort signal and every
    /// estimate is zero.
    pub fn score_all(
        &self,
        markers: &[DebtMarker],
        sources: &SourceMap,
        history: &HistoryIndex,
    ) -> BTreeMap<MarkerId, EffortEstimate> {
        if history.is_empty() {
            return markers
                .iter()
                .map(|m| (m.id.clone(), EffortEstimate::default()))
                .collect();
        }

        let texts: BTreeMap<PathBuf, &str> = sources
            .iter()
            .map(|(path, text)| (normalize_path(path), text.as_str()))
            .collect();
        let now = history.reference_time();

        let raw: Vec<(&DebtMarker, f64, usize)> = markers
            .iter()
            .map(|marker| {
                let file = normalize_path(&marker.file);
                let file_history = history.get(&file);
                let length = self.context_length(marker, texts.get(&file).copied());
                let rt = self.resolution_time(marker, length, file_history, now);
                let fm = file_history.map(|h| h.modifications).unwrap_or(0);
                (marker, rt, fm)
            })
            .collect();

        let max_rt = raw.iter().map(|(_, rt, _)| *rt).fold(0.0, f64::max).max(1.0);
        let max_fm = raw.iter().map(|(_, _, fm)| *fm).max().unwrap_or(0).max(1) as f64;
        let lambda = self.config.lambda;

        raw.into_iter()
            .map(|(marker, rt, fm)| {
                let score = lambda * (rt / max_rt) + (1.0 - lambda) * (fm as f64 / max_fm);
                let estimate = EffortEstimate {
                    resolution_time: rt,
                    modifications: fm,
                    score: score.clamp(0.0, 1.0),
                };
                (marker.id.clone(), estimate)
            })
            .collect()
    }
}
