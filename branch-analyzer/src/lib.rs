//! Single-branch analysis: run the selected tools over one working tree,
//! deduplicate their findings, attach metrics.
//!
//! Execution model:
//! - Tools run concurrently under a `Semaphore` sized by the configured
//!   fan-out (default: CPU count).
//! - Tool invocations may complete in any order; results are re-sorted by
//!   tool name before concatenation, so fingerprint dedup (whose tie-break
//!   is first-seen) is deterministic.
//! - A tool failure or timeout degrades the analysis (recorded in
//!   `tool_failures`), it never fails the run.
//!
//! Caching: the key is `(repo, branch)`, deliberately without the commit
//! hash. A branch pointer may move during the 1-hour TTL and serve one
//! stale analysis; that staleness bound is accepted in exchange for cheap
//! lookups, and re-analysis is cheap when the per-tool caches are warm.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use analysis_cache::{AnalysisCache, CacheKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use tool_adapters::{
    AgentProfile, DEFAULT_TOOL_TIMEOUT, IssueCategory, ToolIssue, ToolRegistry, ToolRunStatus,
};
use tree_indexer::RepositoryIndex;

pub mod dedup;
pub mod errors;
pub mod metrics;

pub use dedup::{dedup_by_fingerprint, detail_score};
pub use errors::{AnalyzeError, AnalyzeResult};
pub use metrics::{BranchMetrics, SeverityWeights, compute_metrics};

/// Per-run knobs. `categories` empty means "everything the registry has".
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub categories: Vec<IssueCategory>,
    /// When present, only tools some profile asks for are scheduled.
    pub agents: Option<Vec<AgentProfile>>,
    /// Worker-pool bound for concurrent tool invocations.
    pub max_parallel_tools: usize,
    pub tool_timeout: Duration,
    pub severity_weights: SeverityWeights,
    pub use_cache: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            agents: None,
            max_parallel_tools: num_cpus::get(),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            severity_weights: SeverityWeights::default(),
            use_cache: true,
        }
    }
}

/// Result of analyzing one branch. Cached under `(repo, branch)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchAnalysis {
    pub repo_url: String,
    pub branch: String,
    pub commit_hash: String,
    pub file_count: u64,
    /// Tools scheduled for this run (including skipped/failed ones).
    pub tool_count: u64,
    /// Deduplicated findings in deterministic order.
    pub issues: Vec<ToolIssue>,
    /// Per-tool terminal status for everything that was not a clean success.
    pub tool_failures: BTreeMap<String, ToolRunStatus>,
    pub metrics: BranchMetrics,
    pub analyzed_at: DateTime<Utc>,
}

/// One adapter's contribution to a run; cached per commit when clean.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolRun {
    tool: String,
    version: Option<String>,
    issues: Vec<ToolIssue>,
    status: ToolRunStatus,
}

/// Analyzes one working tree.
///
/// The index supplies the file list and identity (`repo`, `branch`,
/// `commit`); `root` is the tree the tools actually run in.
#[instrument(skip_all, fields(repo = %index.repo_url, branch = %index.branch))]
pub async fn analyze(
    root: &Path,
    index: &RepositoryIndex,
    registry: &ToolRegistry,
    opts: &AnalyzeOptions,
    cache: &AnalysisCache,
) -> AnalyzeResult<BranchAnalysis> {
    let key = CacheKey::branch_analysis(&index.repo_url, &index.branch);
    if opts.use_cache {
        if let Some(cached) = cache.get::<BranchAnalysis>(&key).await {
            debug!("branch analysis cache hit");
            return Ok(cached);
        }
    }

    let started = Instant::now();
    let selected = registry.select(&opts.categories, opts.agents.as_deref());
    debug!(tools = selected.len(), "tools selected");

    // Per-tool file sets from the index, in stable path order.
    let mut planned: Vec<(String, tool_adapters::ToolAdapter, Vec<String>)> = Vec::new();
    for adapter in &selected {
        let files: Vec<String> = index
            .files
            .iter()
            .filter(|(path, meta)| adapter.selects_file(path, &meta.language))
            .map(|(path, _)| path.clone())
            .collect();
        planned.push(((*adapter).name().to_string(), (*adapter).clone(), files));
    }

    // Per-tool cache: output for a fixed (repo, branch, tool, commit) is
    // stable, so hits skip the invocation entirely. Only clean successes
    // are cached; failures and timeouts retry on the next run.
    let tool_cache_ok = opts.use_cache && index.commit_hash != tree_indexer::UNKNOWN_COMMIT;
    let mut runs: Vec<ToolRun> = Vec::with_capacity(planned.len());
    let mut to_invoke = Vec::with_capacity(planned.len());
    for (name, adapter, files) in planned {
        if tool_cache_ok {
            let key = CacheKey::tool_result(&index.repo_url, &index.branch, &name, &index.commit_hash);
            if let Some(cached) = cache.get::<ToolRun>(&key).await {
                debug!(tool = %name, "tool result cache hit");
                runs.push(cached);
                continue;
            }
        }
        to_invoke.push((name, adapter, files));
    }

    let semaphore = Arc::new(Semaphore::new(opts.max_parallel_tools.max(1)));
    let mut tasks = Vec::with_capacity(to_invoke.len());
    for (name, adapter, files) in to_invoke {
        let semaphore = Arc::clone(&semaphore);
        let root: PathBuf = root.to_path_buf();
        let timeout = opts.tool_timeout;
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            if files.is_empty() {
                debug!(tool = %name, "no matching files, skipping");
                return ToolRun {
                    tool: name,
                    version: None,
                    issues: Vec::new(),
                    status: ToolRunStatus::Skipped,
                };
            }
            let version = adapter.version(&root).await;
            let t0 = Instant::now();
            let (issues, status) = adapter.invoke(&root, &files, timeout).await;
            debug!(
                tool = %name,
                issues = issues.len(),
                ?status,
                ms = t0.elapsed().as_millis(),
                "tool finished"
            );
            ToolRun {
                tool: name,
                version,
                issues,
                status,
            }
        }));
    }

    let joined = futures::future::join_all(tasks).await;
    for res in joined {
        let run = res.map_err(|e| AnalyzeError::Task(e.to_string()))?;
        if tool_cache_ok && run.status == ToolRunStatus::Success {
            let key =
                CacheKey::tool_result(&index.repo_url, &index.branch, &run.tool, &index.commit_hash);
            cache.put(&key, &run).await;
        }
        runs.push(run);
    }
    // Completion order is nondeterministic; dedup tie-breaking is not.
    runs.sort_by(|a, b| a.tool.cmp(&b.tool));

    let mut tool_failures = BTreeMap::new();
    let mut all_issues: Vec<ToolIssue> = Vec::new();
    for run in runs {
        if run.status != ToolRunStatus::Success {
            warn!(tool = %run.tool, status = ?run.status, "tool did not succeed");
            tool_failures.insert(run.tool.clone(), run.status);
        }
        for mut issue in run.issues {
            issue.tool_version = run.version.clone();
            all_issues.push(issue);
        }
    }

    let issues = dedup_by_fingerprint(all_issues);
    let metrics = compute_metrics(
        &issues,
        &opts.severity_weights,
        index.stats.file_count,
        started.elapsed().as_millis() as u64,
    );

    let analysis = BranchAnalysis {
        repo_url: index.repo_url.clone(),
        branch: index.branch.clone(),
        commit_hash: index.commit_hash.clone(),
        file_count: index.stats.file_count,
        tool_count: selected.len() as u64,
        issues,
        tool_failures,
        metrics,
        analyzed_at: Utc::now(),
    };

    info!(
        issues = analysis.issues.len(),
        failures = analysis.tool_failures.len(),
        ms = analysis.metrics.duration_ms,
        "branch analysis complete"
    );

    if opts.use_cache {
        cache.put(&key, &analysis).await;
    }
    Ok(analysis)
}
