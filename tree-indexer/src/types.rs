//! Index and diff data model.
//!
//! Conventions:
//! - `serde(rename_all = "snake_case")` on enums keeps serialized forms
//!   stable across cache generations.
//! - Paths are repo-relative with forward slashes on every platform.
//! - All maps are `BTreeMap` so iteration and serialization are ordered.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{IndexError, IndexResult};

/// Per-file record inside one [`RepositoryIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Repo-relative path, forward slashes.
    pub path: String,
    pub size_bytes: u64,
    pub line_count: u64,
    /// MD5 hex digest of the file content. Uniqueness within a repository
    /// is what matters here, not collision resistance.
    pub content_hash: String,
    /// Lowercase extension without the dot.
    pub extension: String,
    /// Language tag from the extension table.
    pub language: String,
    pub modified_at: Option<DateTime<Utc>>,
    /// Inline content, kept only for files up to the inline limit.
    pub content: Option<String>,
}

/// Aggregate statistics for one index build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub file_count: u64,
    pub total_lines: u64,
    pub total_bytes: u64,
    /// language tag → file count.
    pub languages: BTreeMap<String, u64>,
    pub build_ms: u64,
    /// Files skipped by the walk (oversize, unreadable, unsupported are
    /// not counted separately; this is the unreadable count for reporting).
    pub unreadable_files: u64,
}

/// Snapshot view of one working tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryIndex {
    pub repo_url: String,
    pub branch: String,
    /// `"unknown"` when git metadata was unavailable; such indices never
    /// validate against the cache.
    pub commit_hash: String,
    pub indexed_at: DateTime<Utc>,
    /// Membership set and metadata, keyed by relative path.
    pub files: BTreeMap<String, FileMeta>,
    /// path → content hash. Always mirrors `files`.
    pub hashes: BTreeMap<String, String>,
    /// extension → sorted paths.
    pub by_extension: BTreeMap<String, Vec<String>>,
    /// language tag → sorted paths.
    pub by_language: BTreeMap<String, Vec<String>>,
    pub stats: IndexStats,
}

impl RepositoryIndex {
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Sorted path list (BTreeMap key order).
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Checks the internal invariants: every path has exactly one metadata
    /// entry and one hash, and the derived maps agree with the metadata.
    pub fn verify_consistency(&self) -> IndexResult<()> {
        if self.files.len() != self.hashes.len() {
            return Err(IndexError::Invariant(format!(
                "files/hashes cardinality mismatch: {} vs {}",
                self.files.len(),
                self.hashes.len()
            )));
        }
        for (path, meta) in &self.files {
            match self.hashes.get(path) {
                Some(h) if *h == meta.content_hash => {}
                Some(_) => {
                    return Err(IndexError::Invariant(format!(
                        "hash map disagrees with metadata for {path}"
                    )));
                }
                None => {
                    return Err(IndexError::Invariant(format!("missing hash for {path}")));
                }
            }
            let ext_ok = self
                .by_extension
                .get(&meta.extension)
                .map(|v| v.binary_search(path).is_ok())
                .unwrap_or(false);
            let lang_ok = self
                .by_language
                .get(&meta.language)
                .map(|v| v.binary_search(path).is_ok())
                .unwrap_or(false);
            if !ext_ok || !lang_ok {
                return Err(IndexError::Invariant(format!(
                    "derived maps are missing {path}"
                )));
            }
        }
        Ok(())
    }
}

/// Status of one path across the two branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Removed,
    Modified,
    Unchanged,
    Moved,
}

/// Aggregate counters accompanying the diff sets.
///
/// Removed lines on modified files are approximated by the signed
/// line-count delta, per contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffTotals {
    pub added_lines: u64,
    pub removed_lines: u64,
    pub modified_files: u64,
    pub total_changes: u64,
}

/// Partition of paths across the two indices, plus the move relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchDiff {
    /// Present in PR only.
    pub added: Vec<String>,
    /// Present in target only.
    pub removed: Vec<String>,
    /// Present in both with differing content hash.
    pub modified: Vec<String>,
    /// Present in both with the same content hash.
    pub unchanged: Vec<String>,
    /// target path → PR path, detected by content-hash equality.
    pub moved: BTreeMap<String, String>,
    pub totals: DiffTotals,
}

/// Per-path record of status and (for moves) both endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossRef {
    pub main_path: Option<String>,
    pub pr_path: Option<String>,
    pub status: ChangeStatus,
    /// 100 for moves detected by exact content-hash equality.
    pub similarity: Option<u8>,
}

/// Both branch indices plus everything derived from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualIndices {
    pub main: RepositoryIndex,
    pub pr: RepositoryIndex,
    pub diff: BranchDiff,
    /// Keyed under every participating path; moved pairs appear under both
    /// the source and the destination path with identical records.
    pub cross_reference: BTreeMap<String, CrossRef>,
    /// 0–100 summary of structural change magnitude.
    pub impact_score: f64,
}

impl DualIndices {
    /// Looks up the move source (main path) for a PR-side path.
    pub fn move_source_for(&self, pr_path: &str) -> Option<&str> {
        self.cross_reference.get(pr_path).and_then(|xref| {
            if xref.status == ChangeStatus::Moved && xref.pr_path.as_deref() == Some(pr_path) {
                xref.main_path.as_deref()
            } else {
                None
            }
        })
    }

    /// Path-partition invariant: every path that appears in either index
    /// belongs to exactly one of {added, removed, modified, unchanged,
    /// moved-source, moved-destination}.
    pub fn verify_partition(&self) -> IndexResult<()> {
        fn claim<'x>(
            seen: &mut BTreeMap<&'x str, &'static str>,
            path: &'x str,
            set: &'static str,
        ) -> IndexResult<()> {
            if let Some(prev) = seen.insert(path, set) {
                return Err(IndexError::Invariant(format!(
                    "path {path} claimed by both {prev} and {set}"
                )));
            }
            Ok(())
        }

        let mut seen: BTreeMap<&str, &'static str> = BTreeMap::new();
        for p in &self.diff.added {
            claim(&mut seen, p, "added")?;
        }
        for p in &self.diff.removed {
            claim(&mut seen, p, "removed")?;
        }
        for p in &self.diff.modified {
            claim(&mut seen, p, "modified")?;
        }
        for p in &self.diff.unchanged {
            claim(&mut seen, p, "unchanged")?;
        }
        for (src, dst) in &self.diff.moved {
            claim(&mut seen, src, "moved-source")?;
            claim(&mut seen, dst, "moved-destination")?;
        }
        for path in self.main.paths().chain(self.pr.paths()) {
            if !seen.contains_key(path) {
                return Err(IndexError::Invariant(format!(
                    "path {path} missing from the diff partition"
                )));
            }
        }
        Ok(())
    }
}
