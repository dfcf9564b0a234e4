use super::commit::CommitRecord;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Accumulated history for a single file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileHistory {
    pub modifications: usize,
    pub authors: BTreeSet<String>,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileHistory {
    /// Pure function: Accumulate commit data into file history
    fn add_commit(&mut self, commit: &CommitRecord) {
        self.modifications += 1;

        if let Some(author) = &commit.author {
            self.authors.insert(author.clone());
        }

        self.last_modified = Some(
            self.last_modified
                .map(|d| d.max(commit.timestamp))
                .unwrap_or(commit.timestamp),
        );
        self.first_seen = Some(
            self.first_seen
                .map(|d| d.min(commit.timestamp))
                .unwrap_or(commit.timestamp),
        );
    }

    /// Pure function: Calculate file age in days relative to `now`
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        self.first_seen
            .map(|first| (now - first).num_days().max(0))
            .unwrap_or(0)
    }

    pub fn author_count(&self) -> usize {
        self.authors.len()
    }
}

/// Per-file history over the full commit list.
#[derive(Debug, Clone, Default)]
pub struct HistoryIndex {
    files: BTreeMap<PathBuf, FileHistory>,
    newest: Option<DateTime<Utc>>,
}

impl HistoryIndex {
    pub fn from_commits(commits: &[CommitRecord]) -> Self {
        let mut files: BTreeMap<PathBuf, FileHistory> = BTreeMap::new();
        for commit in commits {
            // a commit listing a file twice still counts once
            let touched: BTreeSet<PathBuf> = commit.normalized_files().collect();
            for file in touched {
                files.entry(file).or_default().add_commit(commit);
            }
        }

        Self {
            files,
            newest: commits.iter().map(|c| c.timestamp).max(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.newest.is_none()
    }

    pub fn get(&self, file: &Path) -> Option<&FileHistory> {
        self.files.get(file)
    }

    pub fn modifications(&self, file: &Path) -> usize {
        self.get(file).map(|h| h.modifications).unwrap_or(0)
    }

    /// Timestamp of the newest commit; file ages are measured against it.
    pub fn reference_time(&self) -> Option<DateTime<Utc>> {
        self.newest
    }
}
