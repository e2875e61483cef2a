//! Working-tree walk and per-file metadata extraction.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::indexer::IndexOptions;
use crate::languages::{is_supported_extension, language_for_extension};
use crate::types::{FileMeta, IndexStats};

/// Directory names never descended into.
pub const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    "dist",
    "build",
    "target",
    "out",
    ".git",
    ".svn",
    ".hg",
    "vendor",
    "venv",
    ".venv",
    "coverage",
    ".idea",
    ".vscode",
];

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.') && s != ".")
        .unwrap_or(false)
}

fn is_blocked_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|s| SKIPPED_DIRS.contains(&s))
            .unwrap_or(false)
}

/// Walks `root` and returns metadata for every indexable file, keyed by
/// relative path. Unreadable files are logged and skipped; the count is
/// reported through `stats.unreadable_files`.
pub fn collect_files(
    root: &Path,
    opts: &IndexOptions,
    stats: &mut IndexStats,
) -> BTreeMap<String, FileMeta> {
    let mut files = BTreeMap::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            // Keep the root itself even when the checkout dir is "hidden"
            // (temp dirs often start with a dot).
            if e.depth() == 0 {
                return true;
            }
            !is_hidden(e) && !is_blocked_dir(e)
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "walk error, skipping entry");
                stats.unreadable_files += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let ext = path
            .extension()
            .and_then(|x| x.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();
        if !is_supported_extension(&ext) {
            continue;
        }

        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "stat failed, skipping file");
                stats.unreadable_files += 1;
                continue;
            }
        };
        // A file exactly at the cap is indexed; one byte over is skipped.
        if meta.len() > opts.max_file_size {
            debug!(path = %path.display(), size = meta.len(), "over size cap, skipping");
            continue;
        }

        let rel = pathdiff::diff_paths(path, root)
            .unwrap_or_else(|| path.to_path_buf())
            .to_string_lossy()
            .replace('\\', "/");

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %rel, error = %e, "read failed, skipping file");
                stats.unreadable_files += 1;
                continue;
            }
        };

        let record = build_file_meta(rel.clone(), &bytes, &ext, &meta, opts);
        files.insert(rel, record);
    }

    files
}

fn build_file_meta(
    rel: String,
    bytes: &[u8],
    ext: &str,
    meta: &std::fs::Metadata,
    opts: &IndexOptions,
) -> FileMeta {
    let line_count = count_lines(bytes);
    let content_hash = format!("{:x}", md5::compute(bytes));
    let modified_at = meta
        .modified()
        .ok()
        .map(|t| DateTime::<Utc>::from(t));
    let content = if bytes.len() as u64 <= opts.inline_content_limit {
        String::from_utf8(bytes.to_vec()).ok()
    } else {
        None
    };

    FileMeta {
        path: rel,
        size_bytes: bytes.len() as u64,
        line_count,
        content_hash,
        extension: ext.to_string(),
        language: language_for_extension(ext).to_string(),
        modified_at,
        content,
    }
}

/// Newline count, plus one for a trailing partial line.
fn count_lines(bytes: &[u8]) -> u64 {
    if bytes.is_empty() {
        return 0;
    }
    let newlines = bytes.iter().filter(|b| **b == b'\n').count() as u64;
    if bytes.ends_with(b"\n") {
        newlines
    } else {
        newlines + 1
    }
}
