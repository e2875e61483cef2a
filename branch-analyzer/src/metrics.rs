//! Aggregate metrics for one branch analysis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tool_adapters::{Severity, ToolIssue};

/// Weighting applied to severity counts when computing the criticality
/// score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityWeights {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
    pub info: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            critical: 10.0,
            high: 5.0,
            medium: 2.0,
            low: 1.0,
            info: 0.1,
        }
    }
}

impl SeverityWeights {
    pub fn weight_for(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchMetrics {
    pub total_issues: u64,
    pub by_severity: BTreeMap<String, u64>,
    pub by_category: BTreeMap<String, u64>,
    pub by_tool: BTreeMap<String, u64>,
    pub criticality_score: f64,
    pub duration_ms: u64,
    pub files_analyzed: u64,
}

/// Counts and scores the (already deduplicated) issue list.
pub fn compute_metrics(
    issues: &[ToolIssue],
    weights: &SeverityWeights,
    files_analyzed: u64,
    duration_ms: u64,
) -> BranchMetrics {
    let mut metrics = BranchMetrics {
        total_issues: issues.len() as u64,
        files_analyzed,
        duration_ms,
        ..BranchMetrics::default()
    };
    for issue in issues {
        *metrics
            .by_severity
            .entry(issue.severity.as_str().to_string())
            .or_default() += 1;
        *metrics
            .by_category
            .entry(issue.category.as_str().to_string())
            .or_default() += 1;
        *metrics.by_tool.entry(issue.tool.clone()).or_default() += 1;
        metrics.criticality_score += weights.weight_for(issue.severity);
    }
    metrics
}
