//! Dual-branch index build and branch diff derivation.
//!
//! High-level flow:
//! 1) Build the two single-branch indices (parallel by default);
//! 2) Build a `content hash → main paths` multimap;
//! 3) Walk the PR index: detect moves first, then classify
//!    unchanged / modified / added;
//! 4) Walk the main index: anything left and not a move source is removed;
//! 5) Derive the per-path cross-reference and the impact score.
//!
//! Move detection consumes the main-side path before step 4, so a moved
//! pair is never double-counted as remove+add. When several main paths
//! share a content hash, the first unmatched candidate in ascending path
//! order wins; the choice is deterministic, not incidental.

use std::collections::BTreeMap;
use std::time::Duration;

use analysis_cache::{AnalysisCache, CacheKey};
use tracing::{debug, info, instrument};

use crate::errors::{IndexError, IndexResult};
use crate::indexer::{IndexOptions, IndexRequest, UNKNOWN_COMMIT, build_index_blocking};
use crate::types::{
    BranchDiff, ChangeStatus, CrossRef, DiffTotals, DualIndices, RepositoryIndex,
};

const DUAL_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Impact-score weights: removals weigh most, moves least.
const W_ADDED: f64 = 0.3;
const W_REMOVED: f64 = 0.5;
const W_MODIFIED: f64 = 0.4;
const W_MOVED: f64 = 0.1;

/// One side of the dual build.
#[derive(Debug, Clone)]
pub struct BranchSource {
    pub root: std::path::PathBuf,
    pub branch: String,
    pub commit_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct DualIndexOptions {
    pub index: IndexOptions,
    /// Build the two indices one after the other instead of in parallel
    /// (for memory-constrained runs).
    pub sequential: bool,
}

/// Builds both indices and the derived diff, consulting the cache first.
///
/// Cache validity requires both per-branch HEADs to match the hashes
/// recorded in the cached indices. Failure to build either index aborts
/// the whole operation; partial results are never returned.
#[instrument(skip_all, fields(repo = %repo_url, main = %main.branch, pr = %pr.branch))]
pub async fn build_dual_indices(
    repo_url: &str,
    main: BranchSource,
    pr: BranchSource,
    opts: DualIndexOptions,
    cache: &AnalysisCache,
) -> IndexResult<DualIndices> {
    let pair_branch = format!("{}-vs-{}", main.branch, pr.branch);
    let key = CacheKey::file_index(repo_url, &pair_branch);

    if main.commit_hash != UNKNOWN_COMMIT && pr.commit_hash != UNKNOWN_COMMIT {
        if let Some(cached) = cache.get::<DualIndices>(&key).await {
            if cached.main.commit_hash == main.commit_hash
                && cached.pr.commit_hash == pr.commit_hash
            {
                debug!("dual index cache hit");
                return Ok(cached);
            }
            debug!("dual index cache stale, rebuilding");
        }
    }

    let main_req = IndexRequest {
        root: main.root,
        repo_url: repo_url.to_string(),
        branch: main.branch,
        commit_hash: main.commit_hash,
    };
    let pr_req = IndexRequest {
        root: pr.root,
        repo_url: repo_url.to_string(),
        branch: pr.branch,
        commit_hash: pr.commit_hash,
    };

    let (main_index, pr_index) = if opts.sequential {
        let a = build_index_blocking(&main_req, &opts.index)?;
        let b = build_index_blocking(&pr_req, &opts.index)?;
        (a, b)
    } else {
        let index_opts = opts.index.clone();
        let main_task = tokio::task::spawn_blocking({
            let o = index_opts.clone();
            move || build_index_blocking(&main_req, &o)
        });
        let pr_task =
            tokio::task::spawn_blocking(move || build_index_blocking(&pr_req, &index_opts));
        let a = main_task
            .await
            .map_err(|e| IndexError::Task(e.to_string()))??;
        let b = pr_task
            .await
            .map_err(|e| IndexError::Task(e.to_string()))??;
        (a, b)
    };

    let dual = derive_dual(main_index, pr_index);
    dual.verify_partition()?;

    info!(
        added = dual.diff.added.len(),
        removed = dual.diff.removed.len(),
        modified = dual.diff.modified.len(),
        moved = dual.diff.moved.len(),
        unchanged = dual.diff.unchanged.len(),
        impact = dual.impact_score,
        "dual indices built"
    );

    if dual.main.commit_hash != UNKNOWN_COMMIT && dual.pr.commit_hash != UNKNOWN_COMMIT {
        cache.put_with_ttl(&key, &dual, DUAL_CACHE_TTL).await;
    }
    Ok(dual)
}

/// Pure diff derivation over two finished indices.
pub(crate) fn derive_dual(main: RepositoryIndex, pr: RepositoryIndex) -> DualIndices {
    let mut diff = BranchDiff::default();
    let mut totals = DiffTotals::default();

    // hash → main paths carrying it (ascending path order via BTreeMap walk).
    let mut main_by_hash: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (path, hash) in &main.hashes {
        main_by_hash.entry(hash).or_default().push(path);
    }

    // Paths on the main side already consumed as move sources.
    let mut move_sources: BTreeMap<&str, ()> = BTreeMap::new();

    for (path, meta) in &pr.files {
        match main.files.get(path) {
            None => {
                // Move first: a vanished main path with identical content.
                let candidate = main_by_hash.get(meta.content_hash.as_str()).and_then(|ps| {
                    ps.iter()
                        .find(|p| !pr.files.contains_key(**p) && !move_sources.contains_key(**p))
                        .copied()
                });
                if let Some(src) = candidate {
                    move_sources.insert(src, ());
                    diff.moved.insert(src.to_string(), path.clone());
                } else {
                    totals.added_lines += meta.line_count;
                    diff.added.push(path.clone());
                }
            }
            Some(main_meta) if main_meta.content_hash == meta.content_hash => {
                diff.unchanged.push(path.clone());
            }
            Some(main_meta) => {
                let delta = meta.line_count as i64 - main_meta.line_count as i64;
                if delta >= 0 {
                    totals.added_lines += delta as u64;
                } else {
                    totals.removed_lines += (-delta) as u64;
                }
                diff.modified.push(path.clone());
            }
        }
    }

    for (path, meta) in &main.files {
        if !pr.files.contains_key(path) && !move_sources.contains_key(path.as_str()) {
            totals.removed_lines += meta.line_count;
            diff.removed.push(path.clone());
        }
    }

    totals.modified_files = diff.modified.len() as u64;
    totals.total_changes = (diff.added.len()
        + diff.removed.len()
        + diff.modified.len()
        + diff.moved.len()) as u64;
    diff.totals = totals;

    let cross_reference = build_cross_reference(&diff);
    let impact_score = impact_score(&diff, main.file_count(), pr.file_count());

    DualIndices {
        main,
        pr,
        diff,
        cross_reference,
        impact_score,
    }
}

fn build_cross_reference(diff: &BranchDiff) -> BTreeMap<String, CrossRef> {
    let mut xref = BTreeMap::new();
    for p in &diff.added {
        xref.insert(
            p.clone(),
            CrossRef {
                main_path: None,
                pr_path: Some(p.clone()),
                status: ChangeStatus::Added,
                similarity: None,
            },
        );
    }
    for p in &diff.removed {
        xref.insert(
            p.clone(),
            CrossRef {
                main_path: Some(p.clone()),
                pr_path: None,
                status: ChangeStatus::Removed,
                similarity: None,
            },
        );
    }
    for p in &diff.modified {
        xref.insert(
            p.clone(),
            CrossRef {
                main_path: Some(p.clone()),
                pr_path: Some(p.clone()),
                status: ChangeStatus::Modified,
                similarity: None,
            },
        );
    }
    for p in &diff.unchanged {
        xref.insert(
            p.clone(),
            CrossRef {
                main_path: Some(p.clone()),
                pr_path: Some(p.clone()),
                status: ChangeStatus::Unchanged,
                similarity: Some(100),
            },
        );
    }
    for (src, dst) in &diff.moved {
        // One shared record, keyed under both endpoints.
        let record = CrossRef {
            main_path: Some(src.clone()),
            pr_path: Some(dst.clone()),
            status: ChangeStatus::Moved,
            similarity: Some(100),
        };
        xref.insert(src.clone(), record.clone());
        xref.insert(dst.clone(), record);
    }
    xref
}

fn impact_score(diff: &BranchDiff, main_count: usize, pr_count: usize) -> f64 {
    let weighted = W_ADDED * diff.added.len() as f64
        + W_REMOVED * diff.removed.len() as f64
        + W_MODIFIED * diff.modified.len() as f64
        + W_MOVED * diff.moved.len() as f64;
    let denom = (main_count + pr_count).max(1) as f64;
    (100.0 * weighted / denom).min(100.0)
}
