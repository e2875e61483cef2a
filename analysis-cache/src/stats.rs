//! Monotonic cache counters, updated atomically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    memory_fallbacks: AtomicU64,
    compressions: AtomicU64,
    hit_latency_us: AtomicU64,
    miss_latency_us: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self, latency: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.hit_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_miss(&self, latency: Duration) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.miss_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_memory_fallback(&self) {
        self.memory_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_compression(&self) {
        self.compressions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let avg = |sum_us: u64, n: u64| {
            if n == 0 { 0.0 } else { sum_us as f64 / n as f64 / 1000.0 }
        };
        CacheStatsSnapshot {
            hits,
            misses,
            errors: self.errors.load(Ordering::Relaxed),
            memory_fallbacks: self.memory_fallbacks.load(Ordering::Relaxed),
            compressions: self.compressions.load(Ordering::Relaxed),
            avg_hit_latency_ms: avg(self.hit_latency_us.load(Ordering::Relaxed), hits),
            avg_miss_latency_ms: avg(self.miss_latency_us.load(Ordering::Relaxed), misses),
        }
    }
}

/// Point-in-time view of the counters, safe to serialize into reports.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub memory_fallbacks: u64,
    pub compressions: u64,
    pub avg_hit_latency_ms: f64,
    pub avg_miss_latency_ms: f64,
}

impl CacheStatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = CacheStats::default();
        stats.record_hit(Duration::from_millis(2));
        stats.record_hit(Duration::from_millis(4));
        stats.record_miss(Duration::from_millis(1));
        stats.record_error();
        stats.record_memory_fallback();

        let snap = stats.snapshot();
        assert_eq!(snap.hits, 2);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.memory_fallbacks, 1);
        assert!((snap.avg_hit_latency_ms - 3.0).abs() < 0.01);
        assert!((snap.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
