use std::path::PathBuf;

use thiserror::Error;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    /// Rejected before any I/O happens.
    #[error("invalid repository url: {0}")]
    InvalidUrl(String),

    #[error("git executable not found or not runnable")]
    GitNotAvailable,

    #[error("git {operation} failed: {detail}")]
    GitCommand { operation: String, detail: String },

    #[error("git {operation} exceeded its deadline")]
    GitTimeout { operation: String },

    /// The PR head ref could not be fetched (missing PR, auth, network).
    #[error("failed to fetch pr ref {pr_ref}: {detail}")]
    PrFetch { pr_ref: String, detail: String },

    #[error("refusing to clone into non-empty directory {0}")]
    TargetNotEmpty(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
