//! Metadata cache capability.
//!
//! Resolved metadata is immutable once constructed, so cache races are
//! harmless: concurrent writers for the same key are last-writer-wins and
//! readers only ever observe complete values.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use tokio::sync::Mutex;

use crate::resolver::PreviewMetadata;

/// Maximum number of cached metadata entries in the in-memory backend.
const MAX_CACHE_ENTRIES: usize = 1000;

/// Key-value cache with per-entry expiry.
///
/// `expires_at` of `None` means the entry never expires. TTL policy (when
/// to cache at all, how long) is the resolver's concern; the cache only
/// honors the expiry it is handed.
#[async_trait]
pub trait PreviewCache: Send + Sync {
    /// Look up a cached value. Expired entries are misses.
    async fn get(&self, key: &str) -> Option<PreviewMetadata>;

    /// Store a value until `expires_at` (forever when `None`).
    async fn set(&self, key: &str, value: PreviewMetadata, expires_at: Option<DateTime<Utc>>);
}

struct CacheEntry {
    value: PreviewMetadata,
    expires_at: Option<DateTime<Utc>>,
}

/// Bounded in-memory cache: LRU eviction plus lazy expiry on read.
pub struct MemoryPreviewCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryPreviewCache {
    #[must_use]
    pub fn new() -> Self {
        let capacity =
            NonZeroUsize::new(MAX_CACHE_ENTRIES).expect("cache capacity is non-zero");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl Default for MemoryPreviewCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreviewCache for MemoryPreviewCache {
    async fn get(&self, key: &str) -> Option<PreviewMetadata> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|at| at <= Utc::now()),
            None => return None,
        };
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    async fn set(&self, key: &str, value: PreviewMetadata, expires_at: Option<DateTime<Utc>>) {
        let mut entries = self.entries.lock().await;
        entries.put(key.to_string(), CacheEntry { value, expires_at });
    }
}
