//! Distributed cache tier over Redis.
//!
//! Thin command wrapper around a cloneable `ConnectionManager`; the
//! two-tier policy (fallbacks, stats, compression) lives in
//! [`crate::AnalysisCache`], not here.

use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::errors::{CacheError, CacheResult};

#[derive(Clone)]
pub struct RemoteTier {
    conn: ConnectionManager,
    read_timeout: Duration,
}

impl RemoteTier {
    /// Connects eagerly so a dead endpoint is detected at construction,
    /// where the caller can log once and degrade to memory-only.
    pub async fn connect(endpoint: &str, read_timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(endpoint)?;
        let conn = client.get_tokio_connection_manager().await?;
        debug!(endpoint, "distributed cache tier connected");
        Ok(Self { conn, read_timeout })
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let fut = conn.get::<_, Option<Vec<u8>>>(key);
        match tokio::time::timeout(self.read_timeout, fut).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(CacheError::ReadTimeout),
        }
    }

    pub async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("MGET");
        for k in keys {
            cmd.arg(k);
        }
        let fut = cmd.query_async::<_, Vec<Option<Vec<u8>>>>(&mut conn);
        match tokio::time::timeout(self.read_timeout, fut).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(CacheError::ReadTimeout),
        }
    }

    pub async fn put(&self, key: &str, bytes: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, bytes, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    /// Deletes every key matching `patterns`; returns how many were removed.
    pub async fn delete_matching(&self, patterns: &[String]) -> CacheResult<usize> {
        let mut conn = self.conn.clone();
        let mut all: Vec<String> = Vec::new();
        for pattern in patterns {
            let keys: Vec<String> = conn.keys(pattern).await?;
            all.extend(keys);
        }
        all.sort();
        all.dedup();
        if all.is_empty() {
            return Ok(0);
        }
        let removed: usize = conn.del(all).await?;
        Ok(removed)
    }
}
