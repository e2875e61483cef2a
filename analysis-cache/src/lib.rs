//! Two-tier cache for pipeline artifacts (distributed Redis + in-process LRU).
//!
//! Why cache?
//! - Re-analyzing the same commit should be near-instant: tool output, branch
//!   indices and comparisons are all deterministic for a fixed commit.
//! - Different artifacts age differently, so TTLs are fixed per key kind
//!   (tool output lives for days, a PR comparison for minutes).
//!
//! Behavior contract:
//! - Every write goes to the distributed tier first; on error only the
//!   in-process tier holds the entry (counted as a memory fallback).
//! - Every read tries the distributed tier first; on miss or error the
//!   in-process tier answers if the entry has not expired.
//! - Cache errors **never** propagate. A failed read is a miss, a failed
//!   write is logged and counted. The pipeline must stay correct when the
//!   cache is fully inert.
//!
//! Payloads over a size threshold are zstd-compressed with a one-byte flag
//! prefix so decoding is self-describing.

pub mod compress;
pub mod config;
pub mod errors;
pub mod key;
pub mod memory;
pub mod remote;
pub mod stats;

mod cache;

pub use cache::AnalysisCache;
pub use config::CacheConfig;
pub use errors::{CacheError, CacheResult};
pub use key::{CacheKey, CacheKind, normalize_repo_url};
pub use stats::CacheStatsSnapshot;
