use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Fatal pipeline failures. Tool-level problems never land here; they
/// degrade the report to `partial` instead.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Rejected before any I/O.
    #[error("invalid pull request url: {0}")]
    InvalidPrUrl(String),

    /// Clone / fetch / checkout failure (after working-tree rollback).
    #[error(transparent)]
    Repo(#[from] repo_store::RepoError),

    /// Either branch index failed to build.
    #[error(transparent)]
    Index(#[from] tree_indexer::IndexError),

    /// A branch-analysis task died (panic/cancellation, not a tool error).
    #[error(transparent)]
    Analyze(#[from] branch_analyzer::AnalyzeError),
}
