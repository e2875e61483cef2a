//! Two-tier cache facade.

use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::compress;
use crate::config::CacheConfig;
use crate::key::{CacheKey, CacheKind, normalize_repo_url};
use crate::memory::MemoryTier;
use crate::remote::RemoteTier;
use crate::stats::{CacheStats, CacheStatsSnapshot};

/// Long-lived cache shared by every pipeline stage.
///
/// Construct once (see [`AnalysisCache::connect`]) and pass by reference;
/// tests inject [`AnalysisCache::in_memory`] to run without a backend.
pub struct AnalysisCache {
    remote: Option<RemoteTier>,
    memory: MemoryTier,
    cfg: CacheConfig,
    stats: CacheStats,
}

impl AnalysisCache {
    /// Builds the cache, attaching the distributed tier when an endpoint is
    /// configured and reachable. An unreachable endpoint degrades to the
    /// in-process tier with a single warning.
    pub async fn connect(cfg: CacheConfig) -> Self {
        let remote = match cfg.endpoint.as_deref() {
            Some(endpoint) => match RemoteTier::connect(endpoint, cfg.read_timeout).await {
                Ok(tier) => Some(tier),
                Err(e) => {
                    warn!(error = %e, "distributed cache unavailable, using in-process tier only");
                    None
                }
            },
            None => None,
        };
        Self {
            memory: MemoryTier::new(cfg.memory_capacity),
            remote,
            stats: CacheStats::default(),
            cfg,
        }
    }

    /// In-process tier only. The constructor tests and the orchestrator's
    /// no-endpoint path share this.
    pub fn in_memory(cfg: CacheConfig) -> Self {
        Self {
            memory: MemoryTier::new(cfg.memory_capacity),
            remote: None,
            stats: CacheStats::default(),
            cfg,
        }
    }

    pub fn ttl_for(&self, kind: CacheKind) -> Duration {
        self.cfg.ttl_for(kind)
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Reads and deserializes `key`. Every failure mode (backend error,
    /// timeout, corrupt payload) is a miss; errors are counted, never raised.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let rendered = key.to_string();
        let started = Instant::now();

        if let Some(remote) = &self.remote {
            match remote.get(&rendered).await {
                Ok(Some(stored)) => {
                    if let Some(value) = self.decode_value(&rendered, &stored) {
                        self.stats.record_hit(started.elapsed());
                        return Some(value);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(key = %rendered, error = %e, "remote read failed, trying memory tier");
                    self.stats.record_error();
                }
            }
        }

        match self.memory.get(&rendered) {
            Some(stored) => {
                if self.remote.is_some() {
                    self.stats.record_memory_fallback();
                }
                match self.decode_value(&rendered, &stored) {
                    Some(value) => {
                        self.stats.record_hit(started.elapsed());
                        Some(value)
                    }
                    None => {
                        self.stats.record_miss(started.elapsed());
                        None
                    }
                }
            }
            None => {
                self.stats.record_miss(started.elapsed());
                None
            }
        }
    }

    /// Writes `value` under the kind's TTL.
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let ttl = self.ttl_for(key.kind);
        self.put_with_ttl(key, value, ttl).await;
    }

    /// Writes `value` with an explicit TTL. Write failures are logged and
    /// counted; the entry always lands in the in-process tier.
    pub async fn put_with_ttl<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let rendered = key.to_string();
        let payload = match serde_json::to_vec(value) {
            Ok(p) => p,
            Err(e) => {
                warn!(key = %rendered, error = %e, "cache serialize failed, skipping write");
                self.stats.record_error();
                return;
            }
        };
        let (stored, compressed) = match compress::encode(&payload, self.cfg.compression_threshold)
        {
            Ok(pair) => pair,
            Err(e) => {
                warn!(key = %rendered, error = %e, "cache encode failed, skipping write");
                self.stats.record_error();
                return;
            }
        };
        if compressed {
            self.stats.record_compression();
        }

        if let Some(remote) = &self.remote {
            if let Err(e) = remote.put(&rendered, &stored, ttl).await {
                warn!(key = %rendered, error = %e, "remote write failed, keeping entry in memory tier");
                self.stats.record_error();
                self.stats.record_memory_fallback();
            }
        } else {
            self.stats.record_memory_fallback();
        }
        self.memory.put(&rendered, stored, ttl);
    }

    /// Batch read; result positions align with `keys`.
    pub async fn get_many<T: DeserializeOwned>(&self, keys: &[CacheKey]) -> Vec<Option<T>> {
        let rendered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        let started = Instant::now();

        let mut out: Vec<Option<T>> = Vec::with_capacity(keys.len());
        let remote_values = match &self.remote {
            Some(remote) => match remote.get_many(&rendered).await {
                Ok(values) => Some(values),
                Err(e) => {
                    debug!(error = %e, "remote multi-get failed, trying memory tier");
                    self.stats.record_error();
                    None
                }
            },
            None => None,
        };

        for (i, key) in rendered.iter().enumerate() {
            let stored = remote_values
                .as_ref()
                .and_then(|vs| vs.get(i).cloned().flatten())
                .or_else(|| {
                    let v = self.memory.get(key);
                    if v.is_some() && self.remote.is_some() {
                        self.stats.record_memory_fallback();
                    }
                    v
                });
            let value = stored.and_then(|s| self.decode_value(key, &s));
            if value.is_some() {
                self.stats.record_hit(started.elapsed());
            } else {
                self.stats.record_miss(started.elapsed());
            }
            out.push(value);
        }
        out
    }

    /// Batch write under each key's kind TTL.
    pub async fn put_many<T: Serialize>(&self, entries: &[(CacheKey, T)]) {
        for (key, value) in entries {
            self.put(key, value).await;
        }
    }

    /// Deletes every entry of `repo_url` across all kinds and both tiers.
    /// Returns how many keys the in-process tier dropped (the remote count
    /// is logged; a remote failure does not abort the memory sweep).
    pub async fn invalidate_repo(&self, repo_url: &str) -> usize {
        let repo = normalize_repo_url(repo_url);
        if let Some(remote) = &self.remote {
            let (terminal, nested) = CacheKey::repo_patterns(repo_url);
            match remote.delete_matching(&[terminal, nested]).await {
                Ok(n) => debug!(repo, removed = n, "remote invalidation done"),
                Err(e) => {
                    warn!(repo, error = %e, "remote invalidation failed");
                    self.stats.record_error();
                }
            }
        }
        let removed = self
            .memory
            .remove_matching(|k| CacheKey::rendered_matches_repo(k, &repo));
        debug!(repo, removed, "memory invalidation done");
        removed
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    fn decode_value<T: DeserializeOwned>(&self, key: &str, stored: &[u8]) -> Option<T> {
        let payload = match compress::decode(stored) {
            Ok(p) => p,
            Err(e) => {
                warn!(key, error = %e, "cache payload decode failed");
                self.stats.record_error();
                return None;
            }
        };
        match serde_json::from_slice(&payload) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "cache payload deserialize failed");
                self.stats.record_error();
                None
            }
        }
    }
}
