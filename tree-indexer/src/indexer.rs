//! Single-branch index construction with cache-aside.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use analysis_cache::{AnalysisCache, CacheKey};
use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::errors::{IndexError, IndexResult};
use crate::types::{IndexStats, RepositoryIndex};
use crate::walk;

/// Sentinel commit hash for trees without usable git metadata.
/// Indices built under it never validate against the cache.
pub const UNKNOWN_COMMIT: &str = "unknown";

const INDEX_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Walk and content knobs for one index build.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Files larger than this are skipped (the cap itself is included).
    pub max_file_size: u64,
    /// Files up to this size keep their content inline in the metadata.
    pub inline_content_limit: u64,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024,
            inline_content_limit: 4 * 1024,
        }
    }
}

/// Identity of the tree being indexed. The commit hash comes from the
/// repository manager; this crate never shells out to git itself.
#[derive(Debug, Clone)]
pub struct IndexRequest {
    pub root: PathBuf,
    pub repo_url: String,
    pub branch: String,
    pub commit_hash: String,
}

/// Builds the index for one working tree, consulting the cache first.
///
/// A cached index is only served when its commit hash matches the request's
/// (and neither side is the [`UNKNOWN_COMMIT`] sentinel). On success the
/// fresh index is written back with a 1-hour TTL.
#[instrument(skip_all, fields(repo = %req.repo_url, branch = %req.branch))]
pub async fn build_index(
    req: IndexRequest,
    opts: IndexOptions,
    cache: &AnalysisCache,
) -> IndexResult<RepositoryIndex> {
    let key = CacheKey::file_index(&req.repo_url, &req.branch);
    if req.commit_hash != UNKNOWN_COMMIT {
        if let Some(cached) = cache.get::<RepositoryIndex>(&key).await {
            if cached.commit_hash == req.commit_hash {
                debug!(commit = %req.commit_hash, "index cache hit");
                return Ok(cached);
            }
            debug!(
                cached = %cached.commit_hash,
                current = %req.commit_hash,
                "index cache stale, rebuilding"
            );
        }
    }

    let opts_owned = opts.clone();
    let req_owned = req.clone();
    let index = tokio::task::spawn_blocking(move || build_index_blocking(&req_owned, &opts_owned))
        .await
        .map_err(|e| IndexError::Task(e.to_string()))??;

    if index.commit_hash != UNKNOWN_COMMIT {
        cache.put_with_ttl(&key, &index, INDEX_CACHE_TTL).await;
    }
    Ok(index)
}

/// Synchronous build; the async entrypoint wraps this in `spawn_blocking`.
/// Building the same tree twice yields identical indices modulo
/// `indexed_at` and `build_ms`.
pub fn build_index_blocking(
    req: &IndexRequest,
    opts: &IndexOptions,
) -> IndexResult<RepositoryIndex> {
    let started = Instant::now();
    if !req.root.is_dir() {
        return Err(IndexError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("index root {} is not a directory", req.root.display()),
        )));
    }

    let mut stats = IndexStats::default();
    let files = walk::collect_files(&req.root, opts, &mut stats);

    let mut hashes = BTreeMap::new();
    let mut by_extension: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut by_language: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (path, meta) in &files {
        hashes.insert(path.clone(), meta.content_hash.clone());
        by_extension
            .entry(meta.extension.clone())
            .or_default()
            .push(path.clone());
        by_language
            .entry(meta.language.clone())
            .or_default()
            .push(path.clone());
        stats.total_lines += meta.line_count;
        stats.total_bytes += meta.size_bytes;
        *stats.languages.entry(meta.language.clone()).or_default() += 1;
    }
    stats.file_count = files.len() as u64;
    stats.build_ms = started.elapsed().as_millis() as u64;

    let index = RepositoryIndex {
        repo_url: req.repo_url.clone(),
        branch: req.branch.clone(),
        commit_hash: req.commit_hash.clone(),
        indexed_at: Utc::now(),
        files,
        hashes,
        by_extension,
        by_language,
        stats,
    };
    index.verify_consistency()?;

    info!(
        files = index.stats.file_count,
        lines = index.stats.total_lines,
        ms = index.stats.build_ms,
        "index built"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_cache::CacheConfig;
    use std::fs;

    fn request(root: &std::path::Path, commit: &str) -> IndexRequest {
        IndexRequest {
            root: root.to_path_buf(),
            repo_url: "owner/repo".into(),
            branch: "main".into(),
            commit_hash: commit.into(),
        }
    }

    fn write_tree(dir: &std::path::Path) {
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::write(dir.join("src/a.rs"), "fn a() {}\nfn b() {}\n").unwrap();
        fs::write(dir.join("src/b.py"), "print('hi')\n").unwrap();
        fs::write(dir.join("notes.md"), "# notes\n").unwrap();
    }

    #[test]
    fn builds_consistent_index() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path());

        let index =
            build_index_blocking(&request(dir.path(), "abc123"), &IndexOptions::default()).unwrap();
        assert_eq!(index.file_count(), 3);
        assert_eq!(index.stats.total_lines, 4);
        assert_eq!(index.by_language["rust"], vec!["src/a.rs".to_string()]);
        assert_eq!(index.stats.languages["python"], 1);
        index.verify_consistency().unwrap();
    }

    #[test]
    fn rebuild_is_deterministic_modulo_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path());

        let opts = IndexOptions::default();
        let a = build_index_blocking(&request(dir.path(), "abc123"), &opts).unwrap();
        let b = build_index_blocking(&request(dir.path(), "abc123"), &opts).unwrap();
        assert_eq!(a.files, b.files);
        assert_eq!(a.hashes, b.hashes);
        assert_eq!(a.by_extension, b.by_extension);
        assert_eq!(a.by_language, b.by_language);
    }

    #[test]
    fn empty_tree_produces_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let index =
            build_index_blocking(&request(dir.path(), "abc123"), &IndexOptions::default()).unwrap();
        assert_eq!(index.file_count(), 0);
        assert_eq!(index.stats.total_lines, 0);
        index.verify_consistency().unwrap();
    }

    #[tokio::test]
    async fn cache_hit_requires_matching_commit() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path());
        let cache = AnalysisCache::in_memory(CacheConfig::default());

        let first = build_index(
            request(dir.path(), "commit-a"),
            IndexOptions::default(),
            &cache,
        )
        .await
        .unwrap();

        // Same commit: served from cache (indexed_at is preserved).
        let again = build_index(
            request(dir.path(), "commit-a"),
            IndexOptions::default(),
            &cache,
        )
        .await
        .unwrap();
        assert_eq!(first.indexed_at, again.indexed_at);

        // Different commit: rebuilt.
        let rebuilt = build_index(
            request(dir.path(), "commit-b"),
            IndexOptions::default(),
            &cache,
        )
        .await
        .unwrap();
        assert_eq!(rebuilt.commit_hash, "commit-b");
    }

    #[tokio::test]
    async fn unknown_commit_disables_caching() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path());
        let cache = AnalysisCache::in_memory(CacheConfig::default());

        build_index(
            request(dir.path(), UNKNOWN_COMMIT),
            IndexOptions::default(),
            &cache,
        )
        .await
        .unwrap();
        assert_eq!(cache.stats().hits, 0);

        build_index(
            request(dir.path(), UNKNOWN_COMMIT),
            IndexOptions::default(),
            &cache,
        )
        .await
        .unwrap();
        // Second build still misses: nothing was ever written.
        assert_eq!(cache.stats().hits, 0);
    }
}
