//! Commit records and the commit-relevance signal.

use crate::config::CommitConfig;
use crate::core::paths::{normalize_path, parent_dir};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One commit as supplied by the history collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub files: Vec<PathBuf>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<String>,
}

impl CommitRecord {
    pub fn new(
        hash: impl Into<String>,
        files: impl IntoIterator<Item = impl Into<PathBuf>>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            hash: hash.into(),
            files: files.into_iter().map(Into::into).collect(),
            timestamp,
            author: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Touched files, lexically normalized.
    pub fn normalized_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.files.iter().map(|f| normalize_path(f))
    }
}

/// The `window` most recent commits, newest first (ties by hash).
pub fn recent_commits(commits: &[CommitRecord], window: usize) -> Vec<&CommitRecord> {
    let mut sorted: Vec<&CommitRecord> = commits.iter().collect();
    sorted.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.hash.cmp(&b.hash))
    });
    sorted.truncate(window);
    sorted
}

/// How a commit relates to a marker's file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    Direct,
    SameDirectory,
    Unrelated,
}

/// Pure function: Classify the strongest way a commit touches `file`
pub fn classify_touch(commit: &CommitRecord, file: &Path) -> Touch {
    let dir = parent_dir(file);
    let mut touch = Touch::Unrelated;
    for touched in commit.normalized_files() {
        if touched == file {
            return Touch::Direct;
        }
        if parent_dir(&touched) == dir {
            touch = Touch::SameDirectory;
        }
    }
    touch
}

/// Sum of per-commit contributions over the window, capped at 1.0.
pub fn commit_relevance(file: &Path, window: &[&CommitRecord], config: &CommitConfig) -> f64 {
    let file = normalize_path(file);
    let total: f64 = window
        .iter()
        .map(|commit| match classify_touch(commit, &file) {
            Touch::Direct => config.direct_weight,
            Touch::SameDirectory => config.same_directory_weight,
            Touch::Unrelated => 0.0,
        })
        .sum();
    total.min(1.0)
}
