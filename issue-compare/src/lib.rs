//! Cross-branch issue matching and comparison.
//!
//! Two layers:
//! - [`matcher`]: pairwise, symmetric, deterministic matching of issues
//!   across branches, tolerant of line shifts, content edits and file
//!   moves;
//! - [`comparator`]: the two-branch classification (`new` / `fixed` /
//!   `unchanged`) built on the matcher, producing enhanced issues,
//!   metrics and trends.
//!
//! The comparator is stateless between invocations; the only persistence
//! in the system is the cache, which lives a layer above.

pub mod comparator;
pub mod matcher;
pub mod similarity;
pub mod types;

pub use comparator::{CompareOptions, DEFAULT_MATCH_THRESHOLD, compare};
pub use matcher::{MatchResult, MatchType, match_issues, match_with_file_move};
pub use similarity::{code_similarity, message_similarity};
pub use types::{
    ComparisonMetrics, ComparisonResult, EffortEstimate, EnhancedIssue, FixQuality,
    ImpactCategory, IssueStatus, RiskLevel, TrendSummary,
};
