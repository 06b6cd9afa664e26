//! Short-lived memory of failed upstream requests.
//!
//! A request whose fingerprint failed within the last `ttl` is refused
//! locally instead of being sent upstream again. The cache is advisory:
//! losing it only costs extra upstream calls.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::config::schema::ErrorCacheConfig;
use crate::http::error::ApiError;
use crate::observability::metrics;

pub const RECENTLY_FAILED: &str = "This request failed recently, please try again later";

#[derive(Debug, Clone)]
struct CachedFailure {
    reason: String,
    expires_at: Instant,
}

pub struct ErrorCache {
    entries: DashMap<String, CachedFailure>,
    ttl: Duration,
    max_entries: usize,
}

/// Stable fingerprint for the parts that define an upstream request.
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

impl ErrorCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    pub fn from_config(config: &ErrorCacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_entries)
    }

    /// Refuse the request if the same fingerprint failed recently.
    pub fn check(&self, key: &str) -> Result<(), ApiError> {
        let now = Instant::now();
        let hit = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.reason.clone()),
            _ => None,
        };

        match hit {
            Some(reason) => {
                metrics::record_error_cache_hit();
                tracing::debug!(fingerprint = %key, reason = %reason, "Recent upstream failure replayed");
                Err(ApiError::internal(RECENTLY_FAILED))
            }
            None => {
                self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
                Ok(())
            }
        }
    }

    pub fn record(&self, key: &str, reason: impl Into<String>) {
        if self.max_entries == 0 {
            return;
        }
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(key) {
            self.purge_expired();
            if self.entries.len() >= self.max_entries {
                self.evict_soonest();
            }
        }
        self.entries.insert(
            key.to_string(),
            CachedFailure {
                reason: reason.into(),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop expired failures. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    fn evict_soonest(&self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::error::ErrorKind;

    #[test]
    fn test_fingerprint_is_stable_and_separated() {
        assert_eq!(fingerprint(&["a", "b"]), fingerprint(&["a", "b"]));
        assert_ne!(fingerprint(&["ab", ""]), fingerprint(&["a", "b"]));
        assert_eq!(fingerprint(&["x"]).len(), 64);
    }

    #[test]
    fn test_recorded_failure_short_circuits() {
        let cache = ErrorCache::new(Duration::from_secs(60), 10);
        let key = fingerprint(&["text-to-image", "cat"]);
        assert!(cache.check(&key).is_ok());

        cache.record(&key, "upstream 500");
        let err = cache.check(&key).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.message, RECENTLY_FAILED);
    }

    #[test]
    fn test_expired_failures_are_forgotten() {
        let cache = ErrorCache::new(Duration::ZERO, 10);
        cache.record("k", "boom");
        assert!(cache.check("k").is_ok());
        cache.record("k2", "boom");
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache = ErrorCache::new(Duration::from_secs(60), 3);
        for i in 0..10 {
            cache.record(&format!("k{}", i), "boom");
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.check("k9").is_err());
    }
}
