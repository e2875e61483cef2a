//! Canonical issue record shared by every adapter.
//!
//! Conventions:
//! - `serde(rename_all = "snake_case")` keeps serialized forms stable.
//! - The fingerprint is for **intra-branch** deduplication only; it bakes
//!   in the start line, so cross-branch matching (which must tolerate line
//!   shifts and file moves) uses the layered matcher instead.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Normalized severity ladder. Unknown labels map to `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

/// Issue domain, as reported by the tool (never re-triaged here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Security,
    Quality,
    Performance,
    Dependency,
    Architecture,
}

impl IssueCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCategory::Security => "security",
            IssueCategory::Quality => "quality",
            IssueCategory::Performance => "performance",
            IssueCategory::Dependency => "dependency",
            IssueCategory::Architecture => "architecture",
        }
    }
}

/// Outcome of one adapter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolRunStatus {
    Success,
    Failure,
    Timeout,
    Skipped,
}

/// One normalized finding. Never mutated after creation; the comparator
/// wraps it instead of editing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolIssue {
    /// Stable identifier, derived from the fingerprint (uuid v5).
    pub id: String,
    /// Content-derived digest for intra-branch dedup.
    pub fingerprint: String,
    pub tool: String,
    pub tool_version: Option<String>,
    pub rule_id: String,
    pub category: IssueCategory,
    pub severity: Severity,
    /// Repo-relative path, forward slashes.
    pub file: String,
    /// 1-based.
    pub start_line: u32,
    pub end_line: Option<u32>,
    pub start_column: Option<u32>,
    pub end_column: Option<u32>,
    pub message: String,
    pub details: Option<String>,
    pub snippet: Option<String>,
    pub suggestion: Option<String>,
    pub docs_url: Option<String>,
    /// Tool-reported confidence in [0, 1]; 1.0 when the tool has no notion.
    pub confidence: f32,
    pub tags: Vec<String>,
}

impl ToolIssue {
    /// Builds an issue with the derived fingerprint and stable id; optional
    /// fields start empty and are filled by the adapter when the underlying
    /// tool supplies them.
    pub fn new(
        tool: &str,
        rule_id: &str,
        category: IssueCategory,
        severity: Severity,
        file: &str,
        start_line: u32,
        message: &str,
    ) -> Self {
        let fingerprint = fingerprint(tool, rule_id, file, start_line, message);
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, fingerprint.as_bytes()).to_string();
        Self {
            id,
            fingerprint,
            tool: tool.to_string(),
            tool_version: None,
            rule_id: rule_id.to_string(),
            category,
            severity,
            file: file.to_string(),
            start_line,
            end_line: None,
            start_column: None,
            end_column: None,
            message: message.to_string(),
            details: None,
            snippet: None,
            suggestion: None,
            docs_url: None,
            confidence: 1.0,
            tags: Vec::new(),
        }
    }
}

/// Deterministic digest of `(tool, rule, file, start_line, normalized
/// message)`. Normalization: lowercase, strip non-alphanumerics, truncate
/// to 50 characters.
pub fn fingerprint(tool: &str, rule_id: &str, file: &str, start_line: u32, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tool.as_bytes());
    hasher.update(b":");
    hasher.update(rule_id.as_bytes());
    hasher.update(b":");
    hasher.update(file.as_bytes());
    hasher.update(b":");
    hasher.update(start_line.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(normalize_message(message).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn normalize_message(message: &str) -> String {
    message
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(50)
        .collect()
}

/// Stable output ordering shared by every adapter: file, line, rule,
/// message. Adapters sort before returning so re-runs are comparable.
pub fn sort_issues(issues: &mut [ToolIssue]) {
    issues.sort_by(|a, b| {
        (&a.file, a.start_line, &a.rule_id, &a.message).cmp(&(
            &b.file,
            b.start_line,
            &b.rule_id,
            &b.message,
        ))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint("semgrep", "R1", "src/a.rs", 10, "Unsafe call");
        let b = fingerprint("semgrep", "R1", "src/a.rs", 10, "Unsafe call");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_normalizes_message_noise() {
        let a = fingerprint("t", "r", "f", 1, "Unsafe   call!!");
        let b = fingerprint("t", "r", "f", 1, "unsafe call");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_truncates_long_messages() {
        let head = "a".repeat(50);
        let a = fingerprint("t", "r", "f", 1, &format!("{head}suffix-one"));
        let b = fingerprint("t", "r", "f", 1, &format!("{head}suffix-two"));
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_depends_on_line() {
        let a = fingerprint("t", "r", "f", 1, "m");
        let b = fingerprint("t", "r", "f", 2, "m");
        assert_ne!(a, b);
    }

    #[test]
    fn issue_id_is_stable_for_equal_content() {
        let a = ToolIssue::new("t", "r", IssueCategory::Quality, Severity::Low, "f", 1, "m");
        let b = ToolIssue::new("t", "r", IssueCategory::Quality, Severity::Low, "f", 1, "m");
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn sort_orders_by_file_then_line_then_rule() {
        let mk = |file: &str, line: u32, rule: &str| {
            ToolIssue::new("t", rule, IssueCategory::Quality, Severity::Low, file, line, "m")
        };
        let mut issues = vec![mk("b.rs", 1, "r"), mk("a.rs", 9, "r"), mk("a.rs", 2, "z"), mk("a.rs", 2, "a")];
        sort_issues(&mut issues);
        let keys: Vec<(String, u32, String)> = issues
            .iter()
            .map(|i| (i.file.clone(), i.start_line, i.rule_id.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("a.rs".into(), 2, "a".into()),
                ("a.rs".into(), 2, "z".into()),
                ("a.rs".into(), 9, "r".into()),
                ("b.rs".into(), 1, "r".into()),
            ]
        );
    }
}
