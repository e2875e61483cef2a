//! Repository URL validation and canonicalization.
//!
//! Accepted forms, by design nothing else:
//! - `https://github.com/<owner>/<repo>` (optional trailing `.git` or `/`)
//! - `<owner>/<repo>` shorthand

use crate::errors::{RepoError, RepoResult};

/// A validated repository reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    pub owner: String,
    pub name: String,
}

impl RepoUrl {
    /// Validates `input` before any I/O.
    pub fn parse(input: &str) -> RepoResult<Self> {
        let trimmed = input.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(RepoError::InvalidUrl(input.to_string()));
        }

        let rest = if let Some(rest) = trimmed.strip_prefix("https://github.com/") {
            rest
        } else if trimmed.contains("://") || trimmed.starts_with("git@") {
            // Other schemes are rejected, not guessed at.
            return Err(RepoError::InvalidUrl(input.to_string()));
        } else {
            trimmed
        };
        let rest = rest.trim_end_matches(".git");

        let mut parts = rest.split('/');
        let (Some(owner), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(RepoError::InvalidUrl(input.to_string()));
        };
        if owner.is_empty() || name.is_empty() || !valid_segment(owner) || !valid_segment(name) {
            return Err(RepoError::InvalidUrl(input.to_string()));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Canonical clone URL.
    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.name)
    }

    /// `owner/name` short form, used in keys and logs.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

fn valid_segment(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_and_shorthand() {
        for input in [
            "https://github.com/rust-lang/cargo",
            "https://github.com/rust-lang/cargo.git",
            "https://github.com/rust-lang/cargo/",
            "rust-lang/cargo",
        ] {
            let url = RepoUrl::parse(input).unwrap();
            assert_eq!(url.owner, "rust-lang");
            assert_eq!(url.name, "cargo");
        }
    }

    #[test]
    fn clone_url_is_canonical() {
        let url = RepoUrl::parse("owner/repo").unwrap();
        assert_eq!(url.clone_url(), "https://github.com/owner/repo.git");
        assert_eq!(url.slug(), "owner/repo");
    }

    #[test]
    fn rejects_everything_else() {
        for input in [
            "",
            "owner",
            "owner/repo/extra",
            "git@github.com:owner/repo.git",
            "ssh://git@github.com/owner/repo",
            "https://gitlab.com/owner/repo",
            "owner//repo",
            "owner/re po",
        ] {
            assert!(RepoUrl::parse(input).is_err(), "should reject {input:?}");
        }
    }
}
