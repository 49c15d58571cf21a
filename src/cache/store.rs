//! Cache Store Module
//!
//! Bounded TTL cache combining HashMap storage with insertion-order eviction
//! and lazy expiry.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, InsertionOrder};

// == TTL Cache ==
/// Bounded key-value store with per-entry expiry.
///
/// Expiry is evaluated lazily: an entry is only checked when it is read
/// through [`get`](Self::get) or [`has`](Self::has), or when the caller runs
/// [`cleanup`](Self::cleanup). When a new key would exceed capacity, the
/// earliest inserted key is evicted regardless of how recently it was read.
#[derive(Debug)]
pub struct TtlCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Eviction order
    order: InsertionOrder,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// TTL applied when `set` is called without one
    default_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    // == Constructor ==
    /// Creates a new cache with specified capacity and default TTL.
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            stats: CacheStats::new(max_entries),
            max_entries,
            default_ttl,
        }
    }

    // == Set ==
    /// Stores a value under `key`.
    ///
    /// Overwriting an existing key replaces its value and restarts its TTL
    /// but keeps its eviction position. If `key` is new and the cache is at
    /// capacity, the earliest inserted key is evicted first. A cache with
    /// zero capacity stores nothing.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        if self.max_entries == 0 {
            return;
        }

        let key = key.into();
        let is_overwrite = self.entries.contains_key(&key);

        if !is_overwrite && self.entries.len() >= self.max_entries {
            if let Some(evicted_key) = self.order.pop_oldest() {
                self.entries.remove(&evicted_key);
                self.stats.record_eviction();
                debug!(key = %evicted_key, "cache eviction");
            }
        }

        let entry = CacheEntry::new(value, ttl.unwrap_or(self.default_ttl));
        if !is_overwrite {
            self.order.record(&key);
        }
        self.entries.insert(key, entry);

        self.stats.set_size(self.entries.len());
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns the value if found and not expired. An expired entry is
    /// removed as a side effect and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<V> {
        if self.take_if_expired(key) {
            self.stats.record_miss();
            return None;
        }

        match self.entries.get(key) {
            Some(entry) => {
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Has ==
    /// Same freshness check as [`get`](Self::get) without cloning the value.
    ///
    /// Does not count towards hit/miss statistics.
    pub fn has(&mut self, key: &str) -> bool {
        if self.take_if_expired(key) {
            return false;
        }
        self.entries.contains_key(key)
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether the key was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.order.remove(key);
            self.stats.set_size(self.entries.len());
        }
        removed
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.stats.set_size(0);
    }

    // == Cleanup ==
    /// Sweeps the whole table once, removing every expired entry.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.entries.remove(&key);
            self.order.remove(&key);
        }

        self.stats.record_expirations(count);
        self.stats.set_size(self.entries.len());
        count
    }

    // == Remove Matching ==
    /// Removes every key for which `matches` returns true, expired or not.
    ///
    /// Returns the number of entries removed.
    pub fn remove_matching(&mut self, matches: impl Fn(&str) -> bool) -> usize {
        let doomed: Vec<String> = self
            .order
            .iter()
            .filter(|k| matches(k.as_str()))
            .cloned()
            .collect();
        for key in &doomed {
            self.entries.remove(key);
            self.order.remove(key);
        }
        self.stats.set_size(self.entries.len());
        doomed.len()
    }

    /// Keys currently held, earliest inserted first. Expired entries that
    /// have not been swept yet are included.
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_size(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Removes `key` if it is present and expired. Returns whether it did.
    fn take_if_expired(&mut self, key: &str) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired());
        if expired {
            self.entries.remove(key);
            self.order.remove(key);
            self.stats.record_expirations(1);
            self.stats.set_size(self.entries.len());
            debug!(key, "cache entry expired");
        }
        expired
    }
}
