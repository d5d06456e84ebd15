use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),
}

/// String key/value cache with per-entry TTL.
///
/// The server keeps exactly one entry per logged-in user (the current login
/// token), so the workload is tiny: point get/set/delete, no scans.  The
/// trait exists so the in-process [`MemoryCache`] can be swapped for an
/// external store without touching the auth code.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch a live value.  Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value.  `ttl = None` means the entry never expires.
    /// Overwrites any previous value and its TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Remove an entry.  Returns whether a live entry was present.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}

/// Process-local cache backed by a `HashMap` under an async `RwLock`.
///
/// Expiry is lazy: a dead entry is dropped when it is next read, and a
/// full sweep runs on writes once the map grows past a threshold.  With
/// one entry per user that sweep is rare and cheap.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

/// Sweep dead entries on write once the map holds this many keys.
const PRUNE_THRESHOLD: usize = 1024;

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();

        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(e) if !e.is_expired(now) => return Ok(Some(e.value.clone())),
                Some(_) => {} // expired — fall through to remove it
            }
        }

        // Entry was expired; take the write lock and drop it.  Re-check
        // under the lock since another task may have replaced it.
        let mut entries = self.entries.write().await;
        if let Some(e) = entries.get(key) {
            if e.is_expired(now) {
                entries.remove(key);
                debug!("cache: expired entry dropped, key={}", key);
            } else {
                return Ok(Some(e.value.clone()));
            }
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if entries.len() >= PRUNE_THRESHOLD {
            entries.retain(|_, e| !e.is_expired(now));
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|d| now + d),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.remove(key) {
            Some(e) => Ok(!e.is_expired(now)),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = MemoryCache::new();
        cache.set("k", "v", None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn missing_key_reads_none() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(cache.get("k").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites_value_and_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("k", "old", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        cache.set("k", "new", None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        // The rewrite removed the short TTL, so the entry is still live.
        assert_eq!(cache.get("k").await.unwrap(), Some("new".to_string()));
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let cache = MemoryCache::new();
        cache.set("k", "v", None).await.unwrap();
        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_of_expired_entry_reports_false() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!cache.delete("k").await.unwrap());
    }
}
