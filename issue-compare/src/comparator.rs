//! Two-branch comparison: classify every issue as new, fixed or unchanged.
//!
//! High-level flow:
//! 1) Optionally re-deduplicate both sides (stricter pass);
//! 2) For each PR issue, find the best match among still-unmatched main
//!    issues, using the file-move matcher when the dual-index
//!    cross-reference says the PR file is a move destination;
//! 3) Matched → unchanged, unmatched PR → new, unmatched main → fixed;
//! 4) Wrap classifications as enhanced issues and derive metrics/trends.
//!
//! The comparator is stateless across runs and deterministic: equal inputs
//! produce equal outputs (modulo the `compared_at` stamp).

use branch_analyzer::{BranchAnalysis, dedup_by_fingerprint};
use chrono::Utc;
use tool_adapters::{Severity, ToolIssue};
use tracing::{debug, info, instrument};
use tree_indexer::DualIndices;

use crate::matcher::{MatchResult, match_issues, match_with_file_move};
use crate::types::{
    ComparisonMetrics, ComparisonResult, EnhancedIssue, RiskLevel, TrendSummary,
};

/// Default minimum confidence for accepting a cross-branch match.
pub const DEFAULT_MATCH_THRESHOLD: u8 = 60;

/// Per-category deductions applied to the 100-baseline scores.
const DEDUCT_CRITICAL: f64 = 30.0;
const DEDUCT_HIGH: f64 = 15.0;
const DEDUCT_MEDIUM: f64 = 8.0;
const DEDUCT_LOW: f64 = 3.0;
const DEDUCT_INFO: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Minimum confidence (0–100) for a match to count.
    pub confidence_threshold: u8,
    /// When off, unchanged issues are counted but not materialized.
    pub include_unchanged: bool,
    /// Redo fingerprint dedup on both inputs before matching.
    pub strict_dedup: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_MATCH_THRESHOLD,
            include_unchanged: true,
            strict_dedup: false,
        }
    }
}

/// Compares the two branch analyses.
///
/// `dual` enables file-move-aware matching; without it a moved file's
/// issues degrade to content/fuzzy matching.
#[instrument(skip_all, fields(main = %main.branch, pr = %pr.branch))]
pub fn compare(
    main: &BranchAnalysis,
    pr: &BranchAnalysis,
    dual: Option<&DualIndices>,
    opts: &CompareOptions,
) -> ComparisonResult {
    let main_issues: Vec<ToolIssue> = if opts.strict_dedup {
        dedup_by_fingerprint(main.issues.clone())
    } else {
        main.issues.clone()
    };
    let pr_issues: Vec<ToolIssue> = if opts.strict_dedup {
        dedup_by_fingerprint(pr.issues.clone())
    } else {
        pr.issues.clone()
    };

    let mut main_matched = vec![false; main_issues.len()];
    let mut new_issues: Vec<EnhancedIssue> = Vec::new();
    let mut unchanged_issues: Vec<EnhancedIssue> = Vec::new();
    let mut unchanged_count: u64 = 0;

    for pr_issue in &pr_issues {
        let move_source = dual.and_then(|d| d.move_source_for(&pr_issue.file));

        let mut best: Option<(usize, MatchResult)> = None;
        for (i, main_issue) in main_issues.iter().enumerate() {
            if main_matched[i] {
                continue;
            }
            let result = match move_source {
                Some(old_path) if main_issue.file == old_path => {
                    match_with_file_move(main_issue, pr_issue, old_path, &pr_issue.file)
                }
                _ => match_issues(main_issue, pr_issue),
            };
            if !result.is_match || result.confidence < opts.confidence_threshold {
                continue;
            }
            // Strictly-greater keeps the first of equals: deterministic.
            if best.map(|(_, b)| result.confidence > b.confidence).unwrap_or(true) {
                best = Some((i, result));
            }
        }

        match best {
            Some((i, result)) => {
                main_matched[i] = true;
                unchanged_count += 1;
                // Materialized even when suppressed from the result:
                // the metrics run over new + unchanged either way.
                unchanged_issues.push(EnhancedIssue::unchanged_issue(
                    pr_issue.clone(),
                    result.confidence,
                    result.match_type.expect("match without a type"),
                ));
            }
            None => new_issues.push(EnhancedIssue::new_issue(pr_issue.clone())),
        }
    }

    let fixed_issues: Vec<EnhancedIssue> = main_issues
        .iter()
        .zip(&main_matched)
        .filter(|(_, matched)| !**matched)
        .map(|(issue, _)| EnhancedIssue::fixed_issue(issue.clone()))
        .collect();

    debug!(
        new = new_issues.len(),
        fixed = fixed_issues.len(),
        unchanged = unchanged_count,
        "classification done"
    );

    let metrics = compute_metrics(&new_issues, &fixed_issues, &unchanged_issues, unchanged_count);
    let trends = compute_trends(&metrics, unchanged_count);

    info!(
        risk = ?metrics.risk_level,
        overall = metrics.overall_score,
        "comparison complete"
    );

    if !opts.include_unchanged {
        unchanged_issues.clear();
    }
    ComparisonResult {
        new_issues,
        fixed_issues,
        unchanged_issues,
        metrics,
        trends,
        compared_at: Utc::now(),
    }
}

fn deduction_for(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => DEDUCT_CRITICAL,
        Severity::High => DEDUCT_HIGH,
        Severity::Medium => DEDUCT_MEDIUM,
        Severity::Low => DEDUCT_LOW,
        Severity::Info => DEDUCT_INFO,
    }
}

fn compute_metrics(
    new_issues: &[EnhancedIssue],
    fixed_issues: &[EnhancedIssue],
    unchanged_issues: &[EnhancedIssue],
    unchanged_count: u64,
) -> ComparisonMetrics {
    let mut metrics = ComparisonMetrics::default();
    metrics.by_status.insert("new".into(), new_issues.len() as u64);
    metrics
        .by_status
        .insert("fixed".into(), fixed_issues.len() as u64);
    metrics.by_status.insert("unchanged".into(), unchanged_count);

    for e in new_issues {
        *metrics
            .new_by_severity
            .entry(e.issue.severity.as_str().to_string())
            .or_default() += 1;
    }

    // Category/tool counts run over what the PR branch still carries:
    // new + unchanged.
    for e in new_issues.iter().chain(unchanged_issues.iter()) {
        *metrics
            .by_category
            .entry(e.issue.category.as_str().to_string())
            .or_default() += 1;
        *metrics.by_tool.entry(e.issue.tool.clone()).or_default() += 1;
    }

    // Scores deduct for *introduced* problems only: a PR that carries
    // pre-existing issues untouched still scores a clean 100.
    let mut security = 100.0;
    let mut quality = 100.0;
    let mut performance = 100.0;
    for e in new_issues {
        let deduction = deduction_for(e.issue.severity);
        use tool_adapters::IssueCategory::*;
        match e.issue.category {
            Security | Dependency => security -= deduction,
            Quality | Architecture => quality -= deduction,
            Performance => performance -= deduction,
        }
    }
    metrics.security_score = security.max(0.0);
    metrics.quality_score = quality.max(0.0);
    metrics.performance_score = performance.max(0.0);
    metrics.overall_score = 0.4 * metrics.security_score
        + 0.4 * metrics.quality_score
        + 0.2 * metrics.performance_score;

    let fixed = fixed_issues.len() as f64;
    let new = new_issues.len() as f64;
    metrics.improvement_rate = if fixed > 0.0 { (fixed - new) / fixed } else { 0.0 };

    metrics.risk_level = risk_level(&metrics);
    metrics
}

/// Risk ladder over the *new* issue severity distribution.
fn risk_level(metrics: &ComparisonMetrics) -> RiskLevel {
    let count = |s: &str| metrics.new_by_severity.get(s).copied().unwrap_or(0);
    if count("critical") > 0 {
        RiskLevel::Critical
    } else if count("high") > 2 {
        RiskLevel::High
    } else if count("high") > 0 || count("medium") > 5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn compute_trends(metrics: &ComparisonMetrics, unchanged_count: u64) -> TrendSummary {
    let fix_velocity = metrics.by_status.get("fixed").copied().unwrap_or(0);
    let new_issue_rate = metrics.by_status.get("new").copied().unwrap_or(0);
    let estimated_sprints_to_clean = if fix_velocity > new_issue_rate && unchanged_count > 0 {
        let net = (fix_velocity - new_issue_rate) as f64;
        Some((unchanged_count as f64 / net).ceil() as u32)
    } else {
        None
    };
    TrendSummary {
        fix_velocity,
        new_issue_rate,
        improvement_rate: metrics.improvement_rate,
        estimated_sprints_to_clean,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchType;
    use crate::types::{ImpactCategory, IssueStatus};
    use branch_analyzer::BranchMetrics;
    use std::collections::BTreeMap;
    use tool_adapters::IssueCategory;
    use tree_indexer::{
        BranchDiff, ChangeStatus, CrossRef, IndexStats, RepositoryIndex,
    };

    fn analysis(branch: &str, issues: Vec<ToolIssue>) -> BranchAnalysis {
        BranchAnalysis {
            repo_url: "owner/repo".into(),
            branch: branch.into(),
            commit_hash: format!("{branch}-head"),
            file_count: 10,
            tool_count: 3,
            issues,
            tool_failures: BTreeMap::new(),
            metrics: BranchMetrics::default(),
            analyzed_at: Utc::now(),
        }
    }

    fn issue(
        tool: &str,
        rule: &str,
        category: IssueCategory,
        severity: Severity,
        file: &str,
        line: u32,
        message: &str,
    ) -> ToolIssue {
        ToolIssue::new(tool, rule, category, severity, file, line, message)
    }

    fn empty_index(branch: &str) -> RepositoryIndex {
        RepositoryIndex {
            repo_url: "owner/repo".into(),
            branch: branch.into(),
            commit_hash: format!("{branch}-head"),
            indexed_at: Utc::now(),
            files: BTreeMap::new(),
            hashes: BTreeMap::new(),
            by_extension: BTreeMap::new(),
            by_language: BTreeMap::new(),
            stats: IndexStats::default(),
        }
    }

    fn dual_with_move(src: &str, dst: &str) -> DualIndices {
        let mut diff = BranchDiff::default();
        diff.moved.insert(src.to_string(), dst.to_string());
        let record = CrossRef {
            main_path: Some(src.to_string()),
            pr_path: Some(dst.to_string()),
            status: ChangeStatus::Moved,
            similarity: Some(100),
        };
        let mut cross_reference = BTreeMap::new();
        cross_reference.insert(src.to_string(), record.clone());
        cross_reference.insert(dst.to_string(), record);
        DualIndices {
            main: empty_index("main"),
            pr: empty_index("pr"),
            diff,
            cross_reference,
            impact_score: 0.0,
        }
    }

    /// Scenario 1: identical branches, three tools, one issue each.
    #[test]
    fn identical_branches_are_all_unchanged() {
        let issues = vec![
            issue("semgrep", "S-1", IssueCategory::Security, Severity::Medium, "src/a.ext", 10, "a"),
            issue("eslint", "E-1", IssueCategory::Quality, Severity::Low, "src/a.ext", 10, "b"),
            issue("npm-audit", "D-1", IssueCategory::Dependency, Severity::Info, "src/a.ext", 10, "c"),
        ];
        let main = analysis("main", issues.clone());
        let pr = analysis("pr-1", issues);

        let result = compare(&main, &pr, None, &CompareOptions::default());
        assert!(result.new_issues.is_empty());
        assert!(result.fixed_issues.is_empty());
        assert_eq!(result.unchanged_issues.len(), 3);
        assert_eq!(result.metrics.risk_level, RiskLevel::Low);
        assert_eq!(result.metrics.overall_score, 100.0);
        assert!(result
            .unchanged_issues
            .iter()
            .all(|e| e.match_type == Some(MatchType::Exact) && e.match_confidence == Some(100)));
    }

    /// Scenario 2: new critical security issue, one kept medium issue.
    #[test]
    fn new_critical_security_issue_blocks_and_raises_risk() {
        let kept = issue("semgrep", "Q-1", IssueCategory::Quality, Severity::Medium, "src/a.ext", 10, "kept");
        let main = analysis("main", vec![kept.clone()]);
        let introduced = issue("semgrep", "X-001", IssueCategory::Security, Severity::Critical, "src/b.ext", 5, "injection");
        let pr = analysis("pr-1", vec![kept, introduced]);

        let result = compare(&main, &pr, None, &CompareOptions::default());
        assert_eq!(result.new_issues.len(), 1);
        assert!(result.fixed_issues.is_empty());
        assert_eq!(result.unchanged_issues.len(), 1);

        let new = &result.new_issues[0];
        assert_eq!(new.status, IssueStatus::New);
        assert!(new.blocks_pr);
        assert!(new.requires_action);
        assert_eq!(new.impact, Some(ImpactCategory::Breaking));
        assert_eq!(result.metrics.risk_level, RiskLevel::Critical);
        assert!(result.metrics.security_score <= 70.0);
    }

    /// Scenario 3: a high issue fixed, the rest kept.
    #[test]
    fn fixed_high_issue_earns_credit_and_improvement() {
        let kept_a = issue("semgrep", "Q-1", IssueCategory::Quality, Severity::Low, "src/a.ext", 3, "kept a");
        let kept_b = issue("eslint", "Q-2", IssueCategory::Quality, Severity::Info, "src/b.ext", 8, "kept b");
        let gone = issue("semgrep", "S-9", IssueCategory::Security, Severity::High, "src/a.ext", 20, "fixed");
        let main = analysis("main", vec![kept_a.clone(), kept_b.clone(), gone]);
        let pr = analysis("pr-1", vec![kept_a, kept_b]);

        let result = compare(&main, &pr, None, &CompareOptions::default());
        assert!(result.new_issues.is_empty());
        assert_eq!(result.fixed_issues.len(), 1);
        assert_eq!(result.unchanged_issues.len(), 2);
        assert_eq!(result.fixed_issues[0].fix_credit, Some(5.0));
        assert!(result.metrics.improvement_rate > 0.0);
        assert_eq!(result.trends.fix_velocity, 1);
        assert_eq!(result.trends.estimated_sprints_to_clean, Some(2));
    }

    /// Scenario 4: file moved, issue unchanged via the move matcher.
    #[test]
    fn moved_file_issue_is_unchanged_not_add_plus_remove() {
        let before = issue("semgrep", "R-7", IssueCategory::Quality, Severity::Medium, "src/old.ext", 15, "m");
        let after = issue("semgrep", "R-7", IssueCategory::Quality, Severity::Medium, "src/new.ext", 15, "m");
        let main = analysis("main", vec![before]);
        let pr = analysis("pr-1", vec![after]);
        let dual = dual_with_move("src/old.ext", "src/new.ext");

        let result = compare(&main, &pr, Some(&dual), &CompareOptions::default());
        assert!(result.new_issues.is_empty());
        assert!(result.fixed_issues.is_empty());
        assert_eq!(result.unchanged_issues.len(), 1);
        let e = &result.unchanged_issues[0];
        assert_eq!(e.match_type, Some(MatchType::Moved));
        assert_eq!(e.match_confidence, Some(95));
    }

    /// Scenario 5: same rule, same file, two lines apart.
    #[test]
    fn small_line_shift_matches_with_decayed_confidence() {
        let before = issue("semgrep", "R-9", IssueCategory::Quality, Severity::Medium, "src/a.ext", 12, "m");
        let after = issue("semgrep", "R-9", IssueCategory::Quality, Severity::Medium, "src/a.ext", 14, "m");
        let main = analysis("main", vec![before]);
        let pr = analysis("pr-1", vec![after]);

        let result = compare(&main, &pr, None, &CompareOptions::default());
        assert_eq!(result.unchanged_issues.len(), 1);
        let e = &result.unchanged_issues[0];
        assert_eq!(e.match_type, Some(MatchType::LineShift));
        assert_eq!(e.match_confidence, Some(86));
    }

    /// Scenario 6: same rule, different files, identical snippet.
    #[test]
    fn identical_snippet_across_files_matches_as_content() {
        let mut before = issue("semgrep", "R-3", IssueCategory::Quality, Severity::Medium, "src/a.ext", 5, "entirely alpha words");
        let mut after = issue("semgrep", "R-3", IssueCategory::Quality, Severity::Medium, "src/b.ext", 40, "entirely beta different");
        before.snippet = Some("query(format!(\"select {}\", user))".into());
        after.snippet = Some("query(format!(\"select {}\", user))".into());
        let main = analysis("main", vec![before]);
        let pr = analysis("pr-1", vec![after]);

        let result = compare(&main, &pr, None, &CompareOptions::default());
        assert_eq!(result.unchanged_issues.len(), 1);
        let e = &result.unchanged_issues[0];
        assert_eq!(e.match_type, Some(MatchType::Content));
        assert_eq!(e.match_confidence, Some(80));
    }

    #[test]
    fn empty_branches_compare_to_an_empty_low_risk_result() {
        let main = analysis("main", vec![]);
        let pr = analysis("pr-1", vec![]);
        let result = compare(&main, &pr, None, &CompareOptions::default());
        assert!(result.new_issues.is_empty());
        assert!(result.fixed_issues.is_empty());
        assert!(result.unchanged_issues.is_empty());
        assert_eq!(result.metrics.risk_level, RiskLevel::Low);
        assert_eq!(result.metrics.overall_score, 100.0);
        assert_eq!(result.metrics.improvement_rate, 0.0);
    }

    #[test]
    fn comparison_is_deterministic() {
        let main = analysis(
            "main",
            vec![
                issue("semgrep", "A", IssueCategory::Security, Severity::High, "a.ext", 1, "one"),
                issue("eslint", "B", IssueCategory::Quality, Severity::Low, "b.ext", 2, "two"),
            ],
        );
        let pr = analysis(
            "pr-1",
            vec![
                issue("semgrep", "A", IssueCategory::Security, Severity::High, "a.ext", 4, "one"),
                issue("eslint", "C", IssueCategory::Quality, Severity::Low, "c.ext", 9, "three"),
            ],
        );

        let a = compare(&main, &pr, None, &CompareOptions::default());
        let b = compare(&main, &pr, None, &CompareOptions::default());
        assert_eq!(a.new_issues, b.new_issues);
        assert_eq!(a.fixed_issues, b.fixed_issues);
        assert_eq!(a.unchanged_issues, b.unchanged_issues);
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.trends, b.trends);
    }

    #[test]
    fn suppressing_unchanged_keeps_the_metrics() {
        let kept = issue("semgrep", "Q-1", IssueCategory::Quality, Severity::Medium, "a.ext", 1, "kept");
        let main = analysis("main", vec![kept.clone()]);
        let pr = analysis("pr-1", vec![kept]);

        let opts = CompareOptions {
            include_unchanged: false,
            ..CompareOptions::default()
        };
        let result = compare(&main, &pr, None, &opts);
        assert!(result.unchanged_issues.is_empty());
        assert_eq!(result.metrics.by_status["unchanged"], 1);
        assert_eq!(result.metrics.by_category["quality"], 1);
        // Carried-over issues do not deduct from the scores.
        assert_eq!(result.metrics.quality_score, 100.0);
    }

    #[test]
    fn below_threshold_matches_become_new_and_fixed() {
        let before = issue("semgrep", "R-1", IssueCategory::Quality, Severity::Medium, "a.ext", 1, "alpha beta");
        let after = issue("eslint", "R-2", IssueCategory::Security, Severity::High, "b.ext", 9, "gamma delta");
        let main = analysis("main", vec![before]);
        let pr = analysis("pr-1", vec![after]);

        let result = compare(&main, &pr, None, &CompareOptions::default());
        assert_eq!(result.new_issues.len(), 1);
        assert_eq!(result.fixed_issues.len(), 1);
        assert!(result.unchanged_issues.is_empty());
    }

    #[test]
    fn each_main_issue_matches_at_most_once() {
        // Two identical PR issues on different lines; only one main issue
        // to pair with. The second PR issue must come out new.
        let main_issue = issue("semgrep", "R-1", IssueCategory::Quality, Severity::Medium, "a.ext", 10, "dup");
        let pr_a = issue("semgrep", "R-1", IssueCategory::Quality, Severity::Medium, "a.ext", 10, "dup");
        let pr_b = issue("semgrep", "R-1", IssueCategory::Quality, Severity::Medium, "a.ext", 12, "dup near");
        let main = analysis("main", vec![main_issue]);
        let pr = analysis("pr-1", vec![pr_a, pr_b]);

        let result = compare(&main, &pr, None, &CompareOptions::default());
        assert_eq!(result.unchanged_issues.len(), 1);
        assert_eq!(result.new_issues.len(), 1);
        assert!(result.fixed_issues.is_empty());
    }
}
