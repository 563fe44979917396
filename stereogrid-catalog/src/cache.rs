//! Short-lived response cache for list and detail reads
//!
//! Entries expire a fixed TTL after insertion, measured on the injected
//! [`Clock`]. The store is always the source of truth: every successful
//! write drops all cached lists and the detail entry of the written song.
//!
//! Each cache counts its invalidations. A reader takes the count before
//! going to the store and only caches what it read if no invalidation ran in
//! between, so a write racing a cache miss cannot leave pre-write data behind.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stereogrid_common::api::PageInfo;
use stereogrid_common::db::SongFilter;
use stereogrid_common::time::Clock;
use stereogrid_common::Song;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Map whose entries go stale after a fixed TTL
#[derive(Debug)]
pub struct TtlCache<K, V> {
    name: &'static str,
    entries: RwLock<HashMap<K, Entry<V>>>,
    /// Bumped under the write lock by every `remove`/`clear`
    generation: AtomicU64,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            ttl,
            clock,
        }
    }

    /// Live value for `key`; an expired entry is evicted and reported as a miss
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if now < entry.expires_at => {
                    debug!(cache = self.name, ?key, "Cache hit");
                    return Some(entry.value.clone());
                }
                None => {
                    debug!(cache = self.name, ?key, "Cache miss");
                    return None;
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| now >= e.expires_at) {
            entries.remove(key);
            debug!(cache = self.name, ?key, "Evicted expired entry");
        }
        None
    }

    /// Invalidation count, taken before reading the value to be cached
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cache `value` unless an invalidation ran after `generation` was taken
    ///
    /// Returns whether the value was stored.
    pub async fn insert_if_current(&self, generation: u64, key: K, value: V) -> bool {
        let entry = self.entry(value);
        let mut entries = self.entries.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(cache = self.name, ?key, "Discarded value read before invalidation");
            return false;
        }
        entries.insert(key, entry);
        true
    }

    #[cfg(test)]
    async fn insert(&self, key: K, value: V) {
        let entry = self.entry(value);
        self.entries.write().await.insert(key, entry);
    }

    fn entry(&self, value: V) -> Entry<V> {
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Entry { value, expires_at }
    }

    pub async fn remove(&self, key: &K) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        if entries.remove(key).is_some() {
            debug!(cache = self.name, ?key, "Invalidated entry");
        }
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        if !entries.is_empty() {
            debug!(cache = self.name, count = entries.len(), "Invalidated all entries");
            entries.clear();
        }
    }

    /// Number of stored entries, expired or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Identity of one list response
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListKey {
    pub filter: SongFilter,
    pub page: i64,
    pub page_size: i64,
}

/// One page of songs with its pagination metadata
#[derive(Debug, Clone)]
pub struct CachedListing {
    pub songs: Vec<Song>,
    pub pagination: PageInfo,
}

/// List and detail caches sharing one TTL
#[derive(Debug)]
pub struct ResponseCache {
    pub lists: TtlCache<ListKey, CachedListing>,
    pub details: TtlCache<i64, Song>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            lists: TtlCache::new("song_lists", ttl, clock.clone()),
            details: TtlCache::new("song_details", ttl, clock),
        }
    }

    /// Drop everything a write to song `id` could have made stale
    pub async fn invalidate_song(&self, id: i64) {
        self.lists.clear().await;
        self.details.remove(&id).await;
    }
}
