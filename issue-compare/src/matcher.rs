//! Layered cross-branch issue matching.
//!
//! Strategies are tried in order, first success wins:
//! 1. exact        — same file, line, rule           → confidence 100
//! 2. line-shift   — same file and rule, |Δ| ≤ 10    → confidence 90 − 2·|Δ|
//! 3. content      — same rule and category, code or message similarity
//! 4. fuzzy        — weighted field score ≥ 0.60     → confidence ≤ 60
//!
//! A separate file-move variant handles issues whose file was renamed
//! between the branches (driven by the dual-index cross-reference).
//!
//! Matching is symmetric and deterministic; a weaker strategy never
//! reports a confidence above a stronger strategy's floor. The thresholds
//! below are contract constants, locked by the tests at the bottom.

use serde::{Deserialize, Serialize};
use tool_adapters::ToolIssue;

use crate::similarity::{code_similarity, message_similarity};

/// Largest line shift (inclusive) strategy 2 tolerates.
pub const LINE_SHIFT_MAX: u32 = 10;
/// Minimum similarity for a content match (code or message).
pub const CONTENT_SIMILARITY_MIN: f64 = 0.80;
/// Minimum weighted score for a fuzzy match.
pub const FUZZY_SCORE_MIN: f64 = 0.60;
/// Message similarity floor for a file-move match with edited text.
pub const MOVE_MESSAGE_SIMILARITY_MIN: f64 = 0.70;

const FUZZY_W_RULE: f64 = 0.3;
const FUZZY_W_CATEGORY: f64 = 0.2;
const FUZZY_W_SEVERITY: f64 = 0.1;
const FUZZY_W_MESSAGE: f64 = 0.4;

/// Which strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    LineShift,
    Content,
    Fuzzy,
    Moved,
}

/// Outcome of one pairwise comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub is_match: bool,
    /// 0–100; 0 when `is_match` is false.
    pub confidence: u8,
    pub match_type: Option<MatchType>,
}

impl MatchResult {
    fn matched(confidence: u8, match_type: MatchType) -> Self {
        Self {
            is_match: true,
            confidence,
            match_type: Some(match_type),
        }
    }

    pub fn no_match() -> Self {
        Self {
            is_match: false,
            confidence: 0,
            match_type: None,
        }
    }
}

/// Standard layered match between two issues from different branches.
pub fn match_issues(a: &ToolIssue, b: &ToolIssue) -> MatchResult {
    // 1. Exact.
    if a.file == b.file && a.start_line == b.start_line && a.rule_id == b.rule_id {
        return MatchResult::matched(100, MatchType::Exact);
    }

    // 2. Line shift within the same file.
    if a.file == b.file && a.rule_id == b.rule_id {
        let delta = a.start_line.abs_diff(b.start_line);
        if delta <= LINE_SHIFT_MAX {
            return MatchResult::matched((90 - 2 * delta) as u8, MatchType::LineShift);
        }
    }

    // 3. Content: same rule and category, matching code or message text.
    if a.rule_id == b.rule_id && a.category == b.category {
        if let (Some(snippet_a), Some(snippet_b)) = (&a.snippet, &b.snippet) {
            let sim = code_similarity(snippet_a, snippet_b);
            if sim >= CONTENT_SIMILARITY_MIN {
                return MatchResult::matched((sim * 80.0).round() as u8, MatchType::Content);
            }
        }
        let sim = message_similarity(&a.message, &b.message);
        if sim >= CONTENT_SIMILARITY_MIN {
            return MatchResult::matched((sim * 70.0).round() as u8, MatchType::Content);
        }
    }

    // 4. Fuzzy: weighted agreement across fields.
    let mut score = 0.0;
    if a.rule_id == b.rule_id {
        score += FUZZY_W_RULE;
    }
    if a.category == b.category {
        score += FUZZY_W_CATEGORY;
    }
    if a.severity == b.severity {
        score += FUZZY_W_SEVERITY;
    }
    score += FUZZY_W_MESSAGE * message_similarity(&a.message, &b.message);
    if score >= FUZZY_SCORE_MIN {
        return MatchResult::matched((score * 60.0).round() as u8, MatchType::Fuzzy);
    }

    MatchResult::no_match()
}

/// Match variant for a file moved from `old_path` to `new_path` (as
/// recorded by the dual-index cross-reference). Only the rule and message
/// carry signal; the location changed by construction.
pub fn match_with_file_move(
    a: &ToolIssue,
    b: &ToolIssue,
    old_path: &str,
    new_path: &str,
) -> MatchResult {
    let paths_align = (a.file == old_path && b.file == new_path)
        || (b.file == old_path && a.file == new_path);
    if !paths_align || a.rule_id != b.rule_id {
        return MatchResult::no_match();
    }

    if a.message == b.message {
        return MatchResult::matched(95, MatchType::Moved);
    }
    if message_similarity(&a.message, &b.message) >= MOVE_MESSAGE_SIMILARITY_MIN {
        return MatchResult::matched(80, MatchType::Moved);
    }
    MatchResult::no_match()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tool_adapters::{IssueCategory, Severity};

    fn issue(rule: &str, file: &str, line: u32, message: &str) -> ToolIssue {
        ToolIssue::new(
            "semgrep",
            rule,
            IssueCategory::Quality,
            Severity::Medium,
            file,
            line,
            message,
        )
    }

    #[test]
    fn exact_match_has_full_confidence() {
        let a = issue("R-1", "src/a.rs", 10, "unused variable");
        let b = issue("R-1", "src/a.rs", 10, "unused variable renamed slightly");
        let m = match_issues(&a, &b);
        assert!(m.is_match);
        assert_eq!(m.confidence, 100);
        assert_eq!(m.match_type, Some(MatchType::Exact));
    }

    #[test]
    fn line_shift_decays_with_distance() {
        let a = issue("R-9", "src/a.rs", 12, "m");
        let b = issue("R-9", "src/a.rs", 14, "m");
        let m = match_issues(&a, &b);
        assert_eq!(m.match_type, Some(MatchType::LineShift));
        assert_eq!(m.confidence, 86);
    }

    #[test]
    fn line_shift_boundary_is_ten() {
        let a = issue("R-1", "src/a.rs", 10, "completely different words here");
        let at_limit = issue("R-1", "src/a.rs", 20, "nothing shared in this text");
        let m = match_issues(&a, &at_limit);
        assert_eq!(m.match_type, Some(MatchType::LineShift));
        assert_eq!(m.confidence, 70);

        let past_limit = issue("R-1", "src/a.rs", 21, "nothing shared in this text");
        let m = match_issues(&a, &past_limit);
        // Falls through; rule+category+severity alone score 0.6 fuzzy.
        assert_ne!(m.match_type, Some(MatchType::LineShift));
    }

    #[test]
    fn content_match_on_identical_snippets_in_different_files() {
        let mut a = issue("R-3", "src/old.rs", 5, "completely reworded alpha");
        let mut b = issue("R-3", "src/new.rs", 50, "no words in common beta");
        a.snippet = Some("let total = items.iter().sum();".into());
        b.snippet = Some("let total = items.iter().sum();".into());
        let m = match_issues(&a, &b);
        assert_eq!(m.match_type, Some(MatchType::Content));
        assert_eq!(m.confidence, 80);
    }

    #[test]
    fn content_match_falls_back_to_message_similarity() {
        let a = issue("R-3", "src/old.rs", 5, "buffer may overflow here");
        let b = issue("R-3", "src/new.rs", 50, "buffer may overflow here");
        let m = match_issues(&a, &b);
        assert_eq!(m.match_type, Some(MatchType::Content));
        assert_eq!(m.confidence, 70);
    }

    #[test]
    fn fuzzy_threshold_boundary() {
        // rule(0.3) + category(0.2) + severity(0.1) + message(0.0) = 0.60.
        let a = issue("R-5", "src/a.rs", 1, "alpha beta");
        let b = issue("R-5", "src/b.rs", 99, "gamma delta");
        let m = match_issues(&a, &b);
        assert_eq!(m.match_type, Some(MatchType::Fuzzy));
        assert_eq!(m.confidence, 36);

        // Drop severity agreement: 0.50 < 0.60 → no match.
        let mut c = issue("R-5", "src/b.rs", 99, "gamma delta");
        c.severity = Severity::High;
        let m = match_issues(&a, &c);
        assert!(!m.is_match);
        assert_eq!(m.confidence, 0);
    }

    #[test]
    fn fuzzy_just_below_threshold_does_not_match() {
        // rule(0.3) + category(0.2) + severity(0.0) + 0.4 × 0.225 = 0.59.
        // 9 shared words, both messages 40 words long.
        let shared: Vec<String> = (0..9).map(|i| format!("shared{i}")).collect();
        let msg_a = {
            let mut words = shared.clone();
            words.extend((0..31).map(|i| format!("left{i}")));
            words.join(" ")
        };
        let msg_b = {
            let mut words = shared;
            words.extend((0..31).map(|i| format!("right{i}")));
            words.join(" ")
        };
        let a = issue("R-5", "src/a.rs", 1, &msg_a);
        let mut b = issue("R-5", "src/b.rs", 99, &msg_b);
        b.severity = Severity::High;

        let m = match_issues(&a, &b);
        assert!(!m.is_match);
    }

    #[test]
    fn matching_is_symmetric() {
        let cases = [
            (
                issue("R-1", "src/a.rs", 10, "unused variable"),
                issue("R-1", "src/a.rs", 14, "unused variable"),
            ),
            (
                issue("R-2", "src/a.rs", 10, "null deref of pointer p"),
                issue("R-2", "src/b.rs", 90, "null deref of pointer q"),
            ),
            (
                issue("R-3", "src/a.rs", 1, "alpha"),
                issue("R-4", "src/b.rs", 2, "beta"),
            ),
        ];
        for (a, b) in &cases {
            let ab = match_issues(a, b);
            let ba = match_issues(b, a);
            assert_eq!(ab.confidence, ba.confidence);
            assert_eq!(ab.match_type, ba.match_type);
        }
    }

    #[test]
    fn weaker_strategies_never_exceed_stronger_floors() {
        // Content caps at 80, below line-shift's 90 ceiling; fuzzy caps at
        // 60, below content's possible 80. Exercised via extremes.
        let mut a = issue("R-1", "x.rs", 1, "same message words");
        let mut b = issue("R-1", "y.rs", 1, "same message words");
        a.snippet = Some("identical snippet".into());
        b.snippet = Some("identical snippet".into());
        let content = match_issues(&a, &b);
        assert!(content.confidence <= 80);

        let c = issue("R-7", "p.rs", 1, "same message words");
        let d = issue("R-7", "q.rs", 2, "same message words");
        // Same rule/category/severity + identical message ⇒ strongest
        // content outcome (message path): 70.
        let m = match_issues(&c, &d);
        assert!(m.confidence <= 80);
    }

    #[test]
    fn file_move_match_with_identical_message() {
        let a = issue("R-7", "src/old.rs", 15, "m");
        let b = issue("R-7", "src/new.rs", 15, "m");
        let m = match_with_file_move(&a, &b, "src/old.rs", "src/new.rs");
        assert_eq!(m.match_type, Some(MatchType::Moved));
        assert_eq!(m.confidence, 95);
    }

    #[test]
    fn file_move_match_with_edited_message() {
        let a = issue("R-7", "src/old.rs", 15, "value may be null in handler");
        let b = issue("R-7", "src/new.rs", 18, "value may be null in dispatcher");
        let m = match_with_file_move(&a, &b, "src/old.rs", "src/new.rs");
        assert_eq!(m.match_type, Some(MatchType::Moved));
        assert_eq!(m.confidence, 80);
    }

    #[test]
    fn file_move_requires_the_recorded_paths_and_rule() {
        let a = issue("R-7", "src/other.rs", 15, "m");
        let b = issue("R-7", "src/new.rs", 15, "m");
        assert!(!match_with_file_move(&a, &b, "src/old.rs", "src/new.rs").is_match);

        let c = issue("R-8", "src/old.rs", 15, "m");
        let d = issue("R-7", "src/new.rs", 15, "m");
        assert!(!match_with_file_move(&c, &d, "src/old.rs", "src/new.rs").is_match);
    }
}
