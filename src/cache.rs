use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entry stored in the map with an expiry timestamp.
#[derive(Clone)]
pub(crate) struct CacheEntry<V> {
    value: V,
    pub(crate) expires_at: Instant,
}

/// In-memory keyed cache with a fixed time-to-live.
///
/// Entries are checked on read and evicted lazily. Writes are plain
/// overwrites, so two callers refreshing the same key at expiry both succeed
/// and the last one wins.
#[derive(Clone)]
pub struct TtlCache<V> {
    pub(crate) entries: Arc<DashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if Instant::now() < entry.expires_at {
                return Some(entry.value.clone());
            }
            // expired: drop the ref before removing
            drop(entry);
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: &str, value: V) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }
}
