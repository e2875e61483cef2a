//! Orchestrator construction parameters, read from the environment once.
//!
//! Deeper layers never touch the environment; everything flows down from
//! this struct at construction time.
//!
//! Variables:
//! - `PR_AUDIT_CACHE_URL`          — redis endpoint (unset = memory-only)
//! - `PR_AUDIT_WORK_DIR`           — base dir for temporary working trees
//! - `PR_AUDIT_MAX_PARALLEL_TOOLS` — tool fan-out per branch
//! - `PR_AUDIT_TOOL_TIMEOUT_SECS`  — per-tool deadline (clamped to 5 min)
//! - `PR_AUDIT_COMPRESSION_THRESHOLD` — cache compression threshold, bytes
//! - `PR_AUDIT_TTL_<KIND>_SECS`    — per-kind cache TTL override, where
//!   `<KIND>` is BRANCH | TOOL | COMPARISON | FILE | REPO

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use analysis_cache::{CacheConfig, CacheKind};
use tool_adapters::MAX_TOOL_TIMEOUT;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub cache_endpoint: Option<String>,
    pub work_dir: PathBuf,
    pub max_parallel_tools: usize,
    pub tool_timeout: Duration,
    pub compression_threshold: usize,
    pub ttl_overrides: HashMap<CacheKind, Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_endpoint: None,
            work_dir: std::env::temp_dir().join("pr-audit"),
            max_parallel_tools: 0, // 0 = analyzer default (CPU count)
            tool_timeout: Duration::from_secs(60),
            compression_threshold: 10 * 1024,
            ttl_overrides: HashMap::new(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("PR_AUDIT_CACHE_URL") {
            if !url.is_empty() {
                config.cache_endpoint = Some(url);
            }
        }
        if let Ok(dir) = std::env::var("PR_AUDIT_WORK_DIR") {
            if !dir.is_empty() {
                config.work_dir = PathBuf::from(dir);
            }
        }
        if let Some(n) = env_usize("PR_AUDIT_MAX_PARALLEL_TOOLS") {
            config.max_parallel_tools = n;
        }
        if let Some(secs) = env_u64("PR_AUDIT_TOOL_TIMEOUT_SECS") {
            config.tool_timeout = Duration::from_secs(secs).min(MAX_TOOL_TIMEOUT);
        }
        if let Some(n) = env_usize("PR_AUDIT_COMPRESSION_THRESHOLD") {
            config.compression_threshold = n;
        }

        let kinds = [
            ("BRANCH", CacheKind::Branch),
            ("TOOL", CacheKind::Tool),
            ("COMPARISON", CacheKind::Comparison),
            ("FILE", CacheKind::File),
            ("REPO", CacheKind::Repo),
        ];
        for (name, kind) in kinds {
            if let Some(secs) = env_u64(&format!("PR_AUDIT_TTL_{name}_SECS")) {
                config.ttl_overrides.insert(kind, Duration::from_secs(secs));
            }
        }
        config
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            endpoint: self.cache_endpoint.clone(),
            compression_threshold: self.compression_threshold,
            ttl_overrides: self.ttl_overrides.clone(),
            ..CacheConfig::default()
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.parse().ok()
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_memory_only_with_sane_limits() {
        let config = OrchestratorConfig::default();
        assert!(config.cache_endpoint.is_none());
        assert_eq!(config.tool_timeout, Duration::from_secs(60));
        assert!(config.ttl_overrides.is_empty());

        let cache = config.cache_config();
        assert!(cache.endpoint.is_none());
        assert_eq!(cache.compression_threshold, 10 * 1024);
    }

    #[test]
    fn ttl_overrides_flow_into_the_cache_config() {
        let mut config = OrchestratorConfig::default();
        config
            .ttl_overrides
            .insert(CacheKind::Comparison, Duration::from_secs(30));
        let cache = config.cache_config();
        assert_eq!(
            cache.ttl_for(CacheKind::Comparison),
            Duration::from_secs(30)
        );
        // Untouched kinds keep their defaults.
        assert_eq!(cache.ttl_for(CacheKind::Tool), CacheKind::Tool.default_ttl());
    }
}
