use thiserror::Error;

pub type AnalyzeResult<T> = Result<T, AnalyzeError>;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// A spawned tool task panicked or was cancelled. Individual tool
    /// failures are *not* errors; they land in the analysis metadata.
    #[error("analysis task failed: {0}")]
    Task(String),
}
