//! In-process cache tier.
//!
//! Bounded map with TTL-on-read and oldest-insertion eviction once capacity
//! is reached. Safe for concurrent get/put behind an `RwLock`; writers take
//! the lock briefly, the eviction sweep runs inline on insert.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

struct MemEntry {
    bytes: Vec<u8>,
    inserted_at: Instant,
    ttl: Duration,
    hits: AtomicU64,
}

impl MemEntry {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

pub struct MemoryTier {
    entries: RwLock<HashMap<String, MemEntry>>,
    capacity: usize,
}

impl MemoryTier {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Returns the stored bytes if present and not expired.
    /// Expired entries are dropped on the spot.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match entries.get(key) {
                Some(e) if !e.expired(now) => {
                    e.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(e.bytes.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Known-expired: upgrade to a write lock and remove.
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.get(key).map(|e| e.expired(now)).unwrap_or(false) {
            entries.remove(key);
        }
        None
    }

    pub fn put(&self, key: &str, bytes: Vec<u8>, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, e| !e.expired(now));
        if entries.len() >= self.capacity && !entries.contains_key(key) {
            // Evict by insertion timestamp (oldest first).
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key.to_string(),
            MemEntry {
                bytes,
                inserted_at: now,
                ttl,
                hits: AtomicU64::new(0),
            },
        );
    }

    /// Accumulated hit count for one key (0 when absent).
    pub fn hit_count(&self, key: &str) -> u64 {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .map(|e| e.hits.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Removes every key accepted by `matches`; returns how many went away.
    pub fn remove_matching(&self, matches: impl Fn(&str) -> bool) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|k, _| !matches(k));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
