//! Pull-request URL parsing.
//!
//! Accepted, by design nothing else:
//! `https://github.com/<owner>/<repo>/pull/<n>` (optional trailing `/`).

use crate::errors::{OrchestratorError, OrchestratorResult};

/// A validated pull-request reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PrRef {
    /// `owner/repo`, the form the repository layer and cache keys use.
    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

pub fn parse_pr_url(input: &str) -> OrchestratorResult<PrRef> {
    let reject = || OrchestratorError::InvalidPrUrl(input.to_string());

    let trimmed = input.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("https://github.com/")
        .ok_or_else(reject)?;

    let mut parts = rest.split('/');
    let (Some(owner), Some(repo), Some(marker), Some(number), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(reject());
    };
    if marker != "pull" || owner.is_empty() || repo.is_empty() {
        return Err(reject());
    }
    let number: u64 = number.parse().map_err(|_| reject())?;
    if number == 0 {
        return Err(reject());
    }

    Ok(PrRef {
        owner: owner.to_string(),
        repo: repo.to_string(),
        number,
    })
}
