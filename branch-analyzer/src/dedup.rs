//! Intra-branch issue deduplication by fingerprint.
//!
//! When two issues share a fingerprint, the one carrying more detail wins;
//! "more detail" is a deterministic score, ties resolve to the first-seen
//! issue. Callers must feed issues in a stable order (tool name, then
//! issue index) so the tie-break itself is deterministic.

use std::collections::HashMap;

use tool_adapters::ToolIssue;

/// Detail score: +2 for a code snippet, +1 each for suggestion,
/// documentation URL and details, plus a bonus proportional to message
/// length.
pub fn detail_score(issue: &ToolIssue) -> u64 {
    let mut score = 0u64;
    if issue.snippet.is_some() {
        score += 2;
    }
    if issue.suggestion.is_some() {
        score += 1;
    }
    if issue.docs_url.is_some() {
        score += 1;
    }
    if issue.details.is_some() {
        score += 1;
    }
    score + (issue.message.len() as u64) / 80
}

/// Collapses duplicate fingerprints, preserving first-seen ordering of the
/// surviving entries. Idempotent: deduplicating a deduplicated list is a
/// no-op.
pub fn dedup_by_fingerprint(issues: Vec<ToolIssue>) -> Vec<ToolIssue> {
    let mut slots: Vec<ToolIssue> = Vec::with_capacity(issues.len());
    let mut by_fingerprint: HashMap<String, usize> = HashMap::new();

    for issue in issues {
        match by_fingerprint.get(&issue.fingerprint) {
            None => {
                by_fingerprint.insert(issue.fingerprint.clone(), slots.len());
                slots.push(issue);
            }
            Some(&slot) => {
                // Strictly greater replaces; equal keeps the incumbent.
                if detail_score(&issue) > detail_score(&slots[slot]) {
                    slots[slot] = issue;
                }
            }
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use tool_adapters::{IssueCategory, Severity};

    fn issue(message: &str) -> ToolIssue {
        ToolIssue::new(
            "t",
            "rule",
            IssueCategory::Quality,
            Severity::Medium,
            "src/a.rs",
            10,
            message,
        )
    }

    #[test]
    fn distinct_fingerprints_all_survive() {
        let a = issue("first problem");
        let mut b = issue("first problem");
        b.fingerprint = "other".into();
        let out = dedup_by_fingerprint(vec![a, b]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn richer_duplicate_wins() {
        let plain = issue("problem");
        let mut rich = issue("problem");
        rich.snippet = Some("let x = 1;".into());
        rich.suggestion = Some("remove it".into());

        let out = dedup_by_fingerprint(vec![plain.clone(), rich.clone()]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].snippet, rich.snippet);

        // Order-independent winner, first-seen position.
        let out = dedup_by_fingerprint(vec![rich.clone(), plain]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].snippet, rich.snippet);
    }

    #[test]
    fn tie_keeps_first_seen() {
        let mut first = issue("problem");
        first.details = Some("from tool run one".into());
        let mut second = issue("problem");
        second.details = Some("from tool run two".into());

        let out = dedup_by_fingerprint(vec![first.clone(), second]);
        assert_eq!(out[0].details, first.details);
    }

    #[test]
    fn dedup_is_idempotent() {
        let mut rich = issue("problem");
        rich.snippet = Some("x".into());
        let input = vec![issue("problem"), rich, issue("unrelated and different")];
        let once = dedup_by_fingerprint(input);
        let twice = dedup_by_fingerprint(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn message_length_contributes_to_score() {
        let short = issue("x");
        let long = issue(&"y".repeat(200));
        assert!(detail_score(&long) > detail_score(&short));
    }
}
