//! Typed cache keys.
//!
//! A rendered key is a colon-joined sequence:
//! `praudit:<kind>:<normalized-repo>[:<branch>][:<tool>][:<pr>][:<hash12>]`
//!
//! Repository URLs are normalized (lowercase, scheme and `.git` stripped,
//! `/` → `:`) so the same repository always lands under the same segment,
//! which is what `invalidate_repo` scans for. Every free-text segment is
//! sanitized to `[A-Za-z0-9_-]` before rendering.

use std::fmt;
use std::time::Duration;

/// Key prefix shared by every entry this backend writes.
pub const KEY_PREFIX: &str = "praudit";

/// Artifact kind; decides the default TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Aggregate branch analysis. Keyed by branch *name*, so a moving branch
    /// pointer can serve a stale result for up to the TTL.
    Branch,
    /// Single tool output for one `(repo, branch, tool)` triple.
    Tool,
    /// Two-branch comparison for one PR.
    Comparison,
    /// File-level artifacts (indices, content records).
    File,
    /// Repository metadata.
    Repo,
    /// Deduplicated issue lists.
    Issues,
    /// Reserved: contextual payloads attached to an analysis.
    Context,
    /// Reserved: conversational payloads attached to an analysis.
    Chat,
}

impl CacheKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKind::Branch => "branch",
            CacheKind::Tool => "tool",
            CacheKind::Comparison => "comparison",
            CacheKind::File => "file",
            CacheKind::Repo => "repo",
            CacheKind::Issues => "issues",
            CacheKind::Context => "context",
            CacheKind::Chat => "chat",
        }
    }

    /// Fixed default TTL per artifact kind.
    ///
    /// - tool output is stable for a given commit → 7 days
    /// - branch analysis may be invalidated by newer commits → 1 hour
    /// - PR comparisons change rapidly → 5 minutes
    pub fn default_ttl(self) -> Duration {
        match self {
            CacheKind::Tool => Duration::from_secs(7 * 24 * 3600),
            CacheKind::Branch => Duration::from_secs(3600),
            CacheKind::Comparison => Duration::from_secs(5 * 60),
            CacheKind::File => Duration::from_secs(24 * 3600),
            CacheKind::Repo => Duration::from_secs(12 * 3600),
            CacheKind::Issues => Duration::from_secs(3600),
            CacheKind::Context => Duration::from_secs(3600),
            CacheKind::Chat => Duration::from_secs(15 * 60),
        }
    }
}

/// Normalizes a repository URL into a stable key segment.
///
/// `https://github.com/Owner/Repo.git` → `github.com:owner:repo`,
/// `owner/repo` → `owner:repo`.
pub fn normalize_repo_url(url: &str) -> String {
    let mut s = url.trim().to_ascii_lowercase();
    for scheme in ["https://", "http://", "ssh://", "git://"] {
        if let Some(rest) = s.strip_prefix(scheme) {
            s = rest.to_string();
            break;
        }
    }
    let s = s.trim_end_matches('/').trim_end_matches(".git");
    s.replace('/', ":")
}

/// Restricts a user-supplied segment to `[A-Za-z0-9_-]`.
pub fn sanitize_segment(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A fully-typed cache key. Render with `to_string()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: CacheKind,
    /// Already-normalized repository segment.
    pub repo: String,
    pub branch: Option<String>,
    pub tool: Option<String>,
    pub pr_number: Option<u64>,
    /// Content-hash prefix (first 12 hex chars are enough to disambiguate).
    pub hash_prefix: Option<String>,
}

impl CacheKey {
    fn new(kind: CacheKind, repo_url: &str) -> Self {
        Self {
            kind,
            repo: normalize_repo_url(repo_url),
            branch: None,
            tool: None,
            pr_number: None,
            hash_prefix: None,
        }
    }

    /// Key for an aggregate branch analysis: `(repo, branch)`.
    pub fn branch_analysis(repo_url: &str, branch: &str) -> Self {
        let mut k = Self::new(CacheKind::Branch, repo_url);
        k.branch = Some(branch.to_string());
        k
    }

    /// Key for a single tool's output on one branch, pinned to content.
    pub fn tool_result(repo_url: &str, branch: &str, tool: &str, commit: &str) -> Self {
        let mut k = Self::new(CacheKind::Tool, repo_url);
        k.branch = Some(branch.to_string());
        k.tool = Some(tool.to_string());
        k.hash_prefix = Some(commit.chars().take(12).collect());
        k
    }

    /// Key for a two-branch comparison: `(repo, pr_number)`.
    pub fn comparison(repo_url: &str, pr_number: u64) -> Self {
        let mut k = Self::new(CacheKind::Comparison, repo_url);
        k.pr_number = Some(pr_number);
        k
    }

    /// Key for a per-branch repository index.
    pub fn file_index(repo_url: &str, branch: &str) -> Self {
        let mut k = Self::new(CacheKind::File, repo_url);
        k.branch = Some(branch.to_string());
        k
    }

    /// Key for repository metadata.
    pub fn repo_meta(repo_url: &str) -> Self {
        Self::new(CacheKind::Repo, repo_url)
    }

    /// Key for a deduplicated issue list.
    pub fn issues(repo_url: &str, branch: &str) -> Self {
        let mut k = Self::new(CacheKind::Issues, repo_url);
        k.branch = Some(branch.to_string());
        k
    }

    /// Match patterns for every key of `repo_url`, across all kinds.
    /// Two shapes because the repo segment may be terminal (`repo` kind)
    /// or followed by further segments.
    pub fn repo_patterns(repo_url: &str) -> (String, String) {
        let repo = normalize_repo_url(repo_url);
        (
            format!("{KEY_PREFIX}:*:{repo}"),
            format!("{KEY_PREFIX}:*:{repo}:*"),
        )
    }

    /// True when `rendered` belongs to `repo` (the normalized segment).
    pub fn rendered_matches_repo(rendered: &str, repo: &str) -> bool {
        // Skip "<prefix>:<kind>:".
        let mut parts = rendered.splitn(3, ':');
        let (Some(prefix), Some(_kind), Some(tail)) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if prefix != KEY_PREFIX {
            return false;
        }
        tail == repo || tail.starts_with(&format!("{repo}:"))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{KEY_PREFIX}:{}:{}", self.kind.as_str(), self.repo)?;
        if let Some(b) = &self.branch {
            write!(f, ":{}", sanitize_segment(b))?;
        }
        if let Some(t) = &self.tool {
            write!(f, ":{}", sanitize_segment(t))?;
        }
        if let Some(n) = self.pr_number {
            write!(f, ":{n}")?;
        }
        if let Some(h) = &self.hash_prefix {
            write!(f, ":{}", sanitize_segment(h))?;
        }
        Ok(())
    }
}
