use thiserror::Error;

/// Convenient alias for crate-wide results.
///
/// Note: the public [`crate::AnalysisCache`] API swallows these by design
/// (reads become misses, writes are logged); the error type exists for the
/// tier internals and for callers of the low-level tiers.
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis transport / command failure.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Payload (de)serialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Compressed payload could not be decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The distributed tier is not configured or unreachable.
    #[error("remote tier unavailable")]
    RemoteUnavailable,

    /// Read deadline exceeded (remote reads are bounded to keep the
    /// pipeline responsive with a degraded backend).
    #[error("cache read timed out")]
    ReadTimeout,
}
