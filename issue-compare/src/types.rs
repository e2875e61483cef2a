//! Comparison result model: enhanced issues, metrics, trends.
//!
//! Everything derived here comes from severity/category tables; no code
//! or free text is invented on top of what the tools reported.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tool_adapters::{IssueCategory, Severity, ToolIssue};

use crate::matcher::MatchType;

/// Cross-branch classification of one issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    New,
    Fixed,
    Unchanged,
}

/// How a new issue lands on the codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactCategory {
    Breaking,
    Degrading,
    Minor,
}

/// Coarse effort bucket derived from severity and category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortEstimate {
    Days,
    Hours,
    Minutes,
}

/// Quality bucket for a fix, derived from what was fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixQuality {
    Significant,
    Moderate,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// A classified issue, immutable once built by the comparator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedIssue {
    pub issue: ToolIssue,
    pub status: IssueStatus,
    /// Present when the classification came from a cross-branch match.
    pub match_confidence: Option<u8>,
    pub match_type: Option<MatchType>,
    /// New issues only.
    pub impact: Option<ImpactCategory>,
    pub requires_action: bool,
    pub blocks_pr: bool,
    /// Fixed issues only.
    pub fix_quality: Option<FixQuality>,
    pub fix_credit: Option<f64>,
    /// Unchanged issues only: how many analyses have seen it (both
    /// branches of this run; there is no cross-run history).
    pub occurrence_count: Option<u32>,
    /// Severity base plus category bonus.
    pub priority: u32,
    pub estimated_effort: EffortEstimate,
}

impl EnhancedIssue {
    /// Wraps a newly-introduced issue.
    pub fn new_issue(issue: ToolIssue) -> Self {
        let impact = match (issue.severity, issue.category) {
            (Severity::Critical, _) => ImpactCategory::Breaking,
            (Severity::High, _) | (_, IssueCategory::Security) => ImpactCategory::Degrading,
            _ => ImpactCategory::Minor,
        };
        let requires_action = matches!(issue.severity, Severity::Critical | Severity::High);
        let blocks_pr = issue.severity == Severity::Critical;
        let priority = priority_of(&issue);
        let estimated_effort = effort_of(&issue);
        Self {
            status: IssueStatus::New,
            match_confidence: None,
            match_type: None,
            impact: Some(impact),
            requires_action,
            blocks_pr,
            fix_quality: None,
            fix_credit: None,
            occurrence_count: None,
            priority,
            estimated_effort,
            issue,
        }
    }

    /// Wraps an issue present in the target branch only.
    pub fn fixed_issue(issue: ToolIssue) -> Self {
        let fix_credit = match issue.severity {
            Severity::Critical => 10.0,
            Severity::High => 5.0,
            Severity::Medium => 3.0,
            Severity::Low => 1.0,
            Severity::Info => 0.5,
        };
        let fix_quality = match issue.severity {
            Severity::Critical | Severity::High => FixQuality::Significant,
            Severity::Medium => FixQuality::Moderate,
            Severity::Low | Severity::Info => FixQuality::Minor,
        };
        let priority = priority_of(&issue);
        let estimated_effort = effort_of(&issue);
        Self {
            status: IssueStatus::Fixed,
            match_confidence: None,
            match_type: None,
            impact: None,
            requires_action: false,
            blocks_pr: false,
            fix_quality: Some(fix_quality),
            fix_credit: Some(fix_credit),
            occurrence_count: None,
            priority,
            estimated_effort,
            issue,
        }
    }

    /// Wraps an issue that matched across the branches.
    pub fn unchanged_issue(issue: ToolIssue, confidence: u8, match_type: MatchType) -> Self {
        let priority = priority_of(&issue);
        let estimated_effort = effort_of(&issue);
        Self {
            status: IssueStatus::Unchanged,
            match_confidence: Some(confidence),
            match_type: Some(match_type),
            impact: None,
            requires_action: false,
            blocks_pr: false,
            fix_quality: None,
            fix_credit: None,
            occurrence_count: Some(2),
            priority,
            estimated_effort,
            issue,
        }
    }
}

/// Severity base (100/80/50/20/10) plus category bonus (security 20,
/// dependency 15, performance 10, quality 5, architecture 5).
fn priority_of(issue: &ToolIssue) -> u32 {
    let base = match issue.severity {
        Severity::Critical => 100,
        Severity::High => 80,
        Severity::Medium => 50,
        Severity::Low => 20,
        Severity::Info => 10,
    };
    let bonus = match issue.category {
        IssueCategory::Security => 20,
        IssueCategory::Dependency => 15,
        IssueCategory::Performance => 10,
        IssueCategory::Quality => 5,
        IssueCategory::Architecture => 5,
    };
    base + bonus
}

fn effort_of(issue: &ToolIssue) -> EffortEstimate {
    if issue.severity == Severity::Critical || issue.category == IssueCategory::Architecture {
        EffortEstimate::Days
    } else if issue.severity == Severity::High || issue.category == IssueCategory::Security {
        EffortEstimate::Hours
    } else {
        EffortEstimate::Minutes
    }
}

/// Aggregate view of one comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    /// status → count.
    pub by_status: BTreeMap<String, u64>,
    /// severity → count of *new* issues (drives the risk level).
    pub new_by_severity: BTreeMap<String, u64>,
    /// category → count across new + unchanged.
    pub by_category: BTreeMap<String, u64>,
    /// tool → count across new + unchanged.
    pub by_tool: BTreeMap<String, u64>,
    /// 100-baseline scores with category-specific deductions.
    pub security_score: f64,
    pub quality_score: f64,
    pub performance_score: f64,
    /// 0.4·security + 0.4·quality + 0.2·performance.
    pub overall_score: f64,
    /// `(fixed − new) / fixed` when fixed > 0, else 0.
    pub improvement_rate: f64,
    pub risk_level: RiskLevel,
}

/// Coarse direction-of-travel summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub fix_velocity: u64,
    pub new_issue_rate: u64,
    pub improvement_rate: f64,
    /// Sprints until the unchanged backlog clears, when fixes outpace new
    /// issues; `None` otherwise.
    pub estimated_sprints_to_clean: Option<u32>,
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Low
    }
}

/// Final comparator output. Cached under `(repo, pr_number)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub new_issues: Vec<EnhancedIssue>,
    pub fixed_issues: Vec<EnhancedIssue>,
    /// Empty when `include_unchanged` was off.
    pub unchanged_issues: Vec<EnhancedIssue>,
    pub metrics: ComparisonMetrics,
    pub trends: TrendSummary,
    pub compared_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: Severity, category: IssueCategory) -> ToolIssue {
        ToolIssue::new("t", "r", category, severity, "f", 1, "m")
    }

    #[test]
    fn new_critical_blocks_the_pr() {
        let e = EnhancedIssue::new_issue(issue(Severity::Critical, IssueCategory::Security));
        assert_eq!(e.impact, Some(ImpactCategory::Breaking));
        assert!(e.requires_action);
        assert!(e.blocks_pr);
        assert_eq!(e.priority, 120);
        assert_eq!(e.estimated_effort, EffortEstimate::Days);
    }

    #[test]
    fn new_security_issue_degrades_even_at_medium_severity() {
        let e = EnhancedIssue::new_issue(issue(Severity::Medium, IssueCategory::Security));
        assert_eq!(e.impact, Some(ImpactCategory::Degrading));
        assert!(!e.requires_action);
        assert!(!e.blocks_pr);
        assert_eq!(e.estimated_effort, EffortEstimate::Hours);
    }

    #[test]
    fn new_minor_issue_is_minutes_of_work() {
        let e = EnhancedIssue::new_issue(issue(Severity::Low, IssueCategory::Quality));
        assert_eq!(e.impact, Some(ImpactCategory::Minor));
        assert_eq!(e.priority, 25);
        assert_eq!(e.estimated_effort, EffortEstimate::Minutes);
    }

    #[test]
    fn fix_credit_follows_the_severity_table() {
        let table = [
            (Severity::Critical, 10.0),
            (Severity::High, 5.0),
            (Severity::Medium, 3.0),
            (Severity::Low, 1.0),
            (Severity::Info, 0.5),
        ];
        for (severity, credit) in table {
            let e = EnhancedIssue::fixed_issue(issue(severity, IssueCategory::Quality));
            assert_eq!(e.fix_credit, Some(credit));
        }
    }

    #[test]
    fn architecture_issues_estimate_days() {
        let e = EnhancedIssue::new_issue(issue(Severity::Low, IssueCategory::Architecture));
        assert_eq!(e.estimated_effort, EffortEstimate::Days);
    }
}
