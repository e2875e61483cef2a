//! End-to-end PR analysis pipeline.
//!
//! Single public entry: [`Orchestrator::analyze_pr`].
//!
//! 1) **Parse + cache check** — reject malformed PR URLs before any I/O;
//!    a fresh cached comparison returns immediately.
//! 2) **Checkout** — the repository store clones the target branch and the
//!    PR head into isolated temporary trees.
//! 3) **Index** — both trees are indexed and diffed (moves detected by
//!    content hash).
//! 4) **Analyze** — the tool fleet runs over each tree concurrently, each
//!    branch consulting the cache first.
//! 5) **Compare** — every issue is classified new / fixed / unchanged with
//!    move-aware matching, then metrics and trends are derived.
//! 6) **Cache + cleanup** — the report is cached under `(repo, pr)`; the
//!    working trees are removed on every path (the store also sweeps on
//!    drop, covering cancellation).
//!
//! Tool failures degrade the report to `partial`; failures in checkout or
//! indexing are fatal and surface as typed errors after cleanup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use analysis_cache::{AnalysisCache, CacheKey};
use branch_analyzer::{AnalyzeOptions, analyze};
use issue_compare::{CompareOptions, ComparisonResult, compare};
use repo_store::RepoStore;
use tool_adapters::{AgentProfile, IssueCategory, ToolRegistry, ToolRunStatus};
use tree_indexer::{BranchSource, DualIndexOptions, build_dual_indices};

pub mod config;
pub mod errors;
pub mod pr_url;

pub use config::OrchestratorConfig;
pub use errors::{OrchestratorError, OrchestratorResult};
pub use pr_url::{PrRef, parse_pr_url};

/// Per-call knobs for one PR analysis.
#[derive(Debug, Clone)]
pub struct AnalyzePrOptions {
    pub target_branch: String,
    /// Empty = every category the registry covers.
    pub categories: Vec<IssueCategory>,
    pub agents: Option<Vec<AgentProfile>>,
    pub include_unchanged: bool,
    pub use_cache: bool,
    /// Build the two indices sequentially (memory-constrained runs).
    pub sequential_indexing: bool,
}

impl Default for AnalyzePrOptions {
    fn default() -> Self {
        Self {
            target_branch: "main".to_string(),
            categories: Vec::new(),
            agents: None,
            include_unchanged: true,
            use_cache: true,
            sequential_indexing: false,
        }
    }
}

/// Overall outcome carried by the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    /// At least one tool adapter failed; the comparison is still valid.
    Partial,
    /// Produced only by [`Orchestrator::run`] when the pipeline aborted.
    Failure,
}

/// Final report returned to the caller and cached under `(repo, pr)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrAnalysisReport {
    pub repo: String,
    pub pr_number: u64,
    pub status: RunStatus,
    /// Tool-level failures (partial runs) or the fatal error (failures).
    pub errors: Vec<String>,
    /// Absent only when `status == Failure`.
    pub comparison: Option<ComparisonResult>,
    /// Structural change magnitude from the dual indices, 0–100.
    pub impact_score: f64,
    pub main_commit: String,
    pub pr_commit: String,
    pub from_cache: bool,
    pub generated_at: DateTime<Utc>,
}

/// Long-lived pipeline front end: one cache, one tool registry, one
/// configuration, many `analyze_pr` calls.
pub struct Orchestrator {
    cache: AnalysisCache,
    registry: ToolRegistry,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Connects the cache (degrading to memory-only with a warning) and
    /// installs the stock tool registry.
    pub async fn new(config: OrchestratorConfig) -> Self {
        let cache = AnalysisCache::connect(config.cache_config()).await;
        Self {
            cache,
            registry: ToolRegistry::with_defaults(),
            config,
        }
    }

    /// Replaces the tool registry (tests inject stub tools this way).
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Analyzes one pull request. Fatal checkout/indexing failures surface
    /// as errors; tool failures degrade the report to `partial`.
    #[instrument(skip_all, fields(pr = %pr_url))]
    pub async fn analyze_pr(
        &self,
        pr_url: &str,
        opts: &AnalyzePrOptions,
    ) -> OrchestratorResult<PrAnalysisReport> {
        let pr = parse_pr_url(pr_url)?;
        let key = CacheKey::comparison(&pr.repo_slug(), pr.number);

        if opts.use_cache {
            if let Some(mut report) = self.cache.get::<PrAnalysisReport>(&key).await {
                debug!("comparison cache hit");
                report.from_cache = true;
                return Ok(report);
            }
        }

        // Fresh store per run: it tracks exactly this run's trees, and its
        // Drop sweeps them even if this future is cancelled mid-flight.
        let store = RepoStore::new(self.config.work_dir.clone())?;
        let result = self.run_pipeline(&store, &pr, opts).await;
        let removed = store.cleanup_all().await;
        debug!(removed, "working trees cleaned up");

        let report = result?;
        if opts.use_cache {
            self.cache.put(&key, &report).await;
        }
        Ok(report)
    }

    /// Convenience wrapper that never errors: fatal failures become a
    /// `Failure` report with the error in `errors`.
    pub async fn run(&self, pr_url: &str, opts: &AnalyzePrOptions) -> PrAnalysisReport {
        match self.analyze_pr(pr_url, opts).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "pr analysis failed");
                let (repo, pr_number) = match parse_pr_url(pr_url) {
                    Ok(pr) => (pr.repo_slug(), pr.number),
                    Err(_) => (pr_url.to_string(), 0),
                };
                PrAnalysisReport {
                    repo,
                    pr_number,
                    status: RunStatus::Failure,
                    errors: vec![e.to_string()],
                    comparison: None,
                    impact_score: 0.0,
                    main_commit: String::new(),
                    pr_commit: String::new(),
                    from_cache: false,
                    generated_at: Utc::now(),
                }
            }
        }
    }

    async fn run_pipeline(
        &self,
        store: &RepoStore,
        pr: &PrRef,
        opts: &AnalyzePrOptions,
    ) -> OrchestratorResult<PrAnalysisReport> {
        let slug = pr.repo_slug();

        let (main_tree, pr_tree) = store
            .prepare_for_pr(&slug, pr.number, &opts.target_branch)
            .await?;
        info!(
            main = %main_tree.commit_hash,
            pr = %pr_tree.commit_hash,
            "working trees ready"
        );

        let dual = build_dual_indices(
            &slug,
            BranchSource {
                root: main_tree.path.clone(),
                branch: main_tree.branch.clone(),
                commit_hash: main_tree.commit_hash.clone(),
            },
            BranchSource {
                root: pr_tree.path.clone(),
                branch: pr_tree.branch.clone(),
                commit_hash: pr_tree.commit_hash.clone(),
            },
            DualIndexOptions {
                sequential: opts.sequential_indexing,
                ..DualIndexOptions::default()
            },
            &self.cache,
        )
        .await?;

        let mut analyze_opts = AnalyzeOptions {
            categories: opts.categories.clone(),
            agents: opts.agents.clone(),
            tool_timeout: self.config.tool_timeout,
            use_cache: opts.use_cache,
            ..AnalyzeOptions::default()
        };
        if self.config.max_parallel_tools > 0 {
            analyze_opts.max_parallel_tools = self.config.max_parallel_tools;
        }

        let (main_analysis, pr_analysis) = tokio::join!(
            analyze(
                &main_tree.path,
                &dual.main,
                &self.registry,
                &analyze_opts,
                &self.cache,
            ),
            analyze(
                &pr_tree.path,
                &dual.pr,
                &self.registry,
                &analyze_opts,
                &self.cache,
            ),
        );
        let main_analysis = main_analysis?;
        let pr_analysis = pr_analysis?;

        let comparison = compare(
            &main_analysis,
            &pr_analysis,
            Some(&dual),
            &CompareOptions {
                include_unchanged: opts.include_unchanged,
                ..CompareOptions::default()
            },
        );

        // Skipped tools had nothing to do; everything else that did not
        // succeed degrades the run to partial.
        let mut errors: Vec<String> = Vec::new();
        for (branch, analysis) in [
            (&main_tree.branch, &main_analysis),
            (&pr_tree.branch, &pr_analysis),
        ] {
            for (tool, status) in &analysis.tool_failures {
                if *status != ToolRunStatus::Skipped {
                    errors.push(format!("{tool} on {branch}: {status:?}"));
                }
            }
        }
        let status = if errors.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Partial
        };

        Ok(PrAnalysisReport {
            repo: slug,
            pr_number: pr.number,
            status,
            errors,
            comparison: Some(comparison),
            impact_score: dual.impact_score,
            main_commit: main_tree.commit_hash.clone(),
            pr_commit: pr_tree.commit_hash.clone(),
            from_cache: false,
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_cache::CacheConfig;
    use branch_analyzer::{BranchAnalysis, BranchMetrics};
    use std::collections::BTreeMap;

    fn empty_analysis(branch: &str) -> BranchAnalysis {
        BranchAnalysis {
            repo_url: "owner/repo".into(),
            branch: branch.into(),
            commit_hash: format!("{branch}-head"),
            file_count: 0,
            tool_count: 0,
            issues: Vec::new(),
            tool_failures: BTreeMap::new(),
            metrics: BranchMetrics::default(),
            analyzed_at: Utc::now(),
        }
    }

    fn orchestrator_in_memory() -> Orchestrator {
        Orchestrator {
            cache: AnalysisCache::in_memory(CacheConfig::default()),
            registry: ToolRegistry::with_defaults(),
            config: OrchestratorConfig::default(),
        }
    }

    #[tokio::test]
    async fn malformed_pr_url_is_rejected_before_io() {
        let orchestrator = orchestrator_in_memory();
        let res = orchestrator
            .analyze_pr("https://github.com/owner/repo", &AnalyzePrOptions::default())
            .await;
        assert!(matches!(res, Err(OrchestratorError::InvalidPrUrl(_))));
    }

    #[tokio::test]
    async fn cached_comparison_short_circuits_the_pipeline() {
        let orchestrator = orchestrator_in_memory();
        let comparison = compare(
            &empty_analysis("main"),
            &empty_analysis("pr-7"),
            None,
            &CompareOptions::default(),
        );
        let report = PrAnalysisReport {
            repo: "owner/repo".into(),
            pr_number: 7,
            status: RunStatus::Success,
            errors: Vec::new(),
            comparison: Some(comparison),
            impact_score: 12.5,
            main_commit: "main-head".into(),
            pr_commit: "pr-head".into(),
            from_cache: false,
            generated_at: Utc::now(),
        };
        let key = CacheKey::comparison("owner/repo", 7);
        orchestrator.cache.put(&key, &report).await;

        // No git, no network: the cache answers.
        let got = orchestrator
            .analyze_pr(
                "https://github.com/owner/repo/pull/7",
                &AnalyzePrOptions::default(),
            )
            .await
            .unwrap();
        assert!(got.from_cache);
        assert_eq!(got.pr_number, 7);
        assert_eq!(got.impact_score, 12.5);
        assert_eq!(got.status, RunStatus::Success);
    }

    #[tokio::test]
    async fn run_wraps_fatal_errors_into_a_failure_report() {
        let orchestrator = orchestrator_in_memory();
        let report = orchestrator
            .run("not-a-pr-url", &AnalyzePrOptions::default())
            .await;
        assert_eq!(report.status, RunStatus::Failure);
        assert!(report.comparison.is_none());
        assert_eq!(report.errors.len(), 1);
    }
}
