//! Keyed read-through cache with a fixed time-to-live
//!
//! Used for sheet contents (keyed by sheet reference) and price maps (keyed
//! by sheet reference + exact ticker list). Expired entries are replaced on
//! the next `insert`; two callers that both miss will both refetch.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Cached value, or None when absent or older than the TTL
    pub async fn get(&self, key: &K) -> Option<V> {
        if self.ttl.is_zero() {
            return None;
        }
        let guard = self.entries.read().await;
        guard.get(key).and_then(|entry| {
            if entry.created_at.elapsed() < self.ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    pub async fn insert(&self, key: K, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        let mut guard = self.entries.write().await;
        // Drop stale entries so the map stays bounded by the live key set
        let ttl = self.ttl;
        guard.retain(|_, entry| entry.created_at.elapsed() < ttl);
        guard.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
