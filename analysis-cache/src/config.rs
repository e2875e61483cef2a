//! Cache construction parameters.

use std::collections::HashMap;
use std::time::Duration;

use crate::key::CacheKind;

/// Construction-time knobs for [`crate::AnalysisCache`].
///
/// The orchestrator builds this once from the environment; deeper layers
/// never read configuration ad hoc.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis endpoint, e.g. `redis://127.0.0.1:6379`. `None` means the
    /// in-process tier alone is used.
    pub endpoint: Option<String>,
    /// Bound on the in-process tier (entries), evicted oldest-first.
    pub memory_capacity: usize,
    /// Payloads at or above this many bytes are zstd-compressed.
    pub compression_threshold: usize,
    /// Deadline for distributed reads.
    pub read_timeout: Duration,
    /// Per-kind TTL overrides; kinds not present use their defaults.
    pub ttl_overrides: HashMap<CacheKind, Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            memory_capacity: 100,
            compression_threshold: 10 * 1024,
            read_timeout: Duration::from_secs(1),
            ttl_overrides: HashMap::new(),
        }
    }
}

impl CacheConfig {
    /// Effective TTL for a kind (override wins over the built-in default).
    pub fn ttl_for(&self, kind: CacheKind) -> Duration {
        self.ttl_overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_ttl())
    }
}
