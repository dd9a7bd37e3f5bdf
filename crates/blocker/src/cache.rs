//! Byte-bounded in-memory cache with per-entry TTL
//!
//! Backs the blocker: a flat key/value store with second-granularity
//! expiry and LRU eviction against a byte budget. Expired entries are
//! dropped lazily on access; eviction runs on insert when the budget is
//! exceeded.
//!
//! Entries larger than 1/1024 of the budget are rejected outright, so a
//! single oversized key cannot wipe the whole cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Errors surfaced by cache operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Entry exceeds the per-entry size limit (budget / 1024)
    #[error("entry is larger than 1/1024 of cache size")]
    EntryTooLarge,

    /// Backend failure, for cache implementations with real I/O
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Storage seam of the blocker.
///
/// `ttl_secs` of zero means the entry never expires until deleted.
/// Implementations with transport errors may signal a missing key either
/// as `Ok(None)` or as an error mentioning "not found"; the blocker
/// treats both as absence.
pub trait BlockCache: Send {
    /// Look up a value.
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, CacheError>;

    /// Insert or replace a value with the given TTL in seconds.
    fn set(&mut self, key: &[u8], value: &[u8], ttl_secs: u64) -> Result<(), CacheError>;

    /// Delete a key, reporting whether it was present.
    fn del(&mut self, key: &[u8]) -> bool;
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
    /// Recency stamp for LRU eviction
    order: u64,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Per-entry bookkeeping overhead, counted against the byte budget.
const ENTRY_OVERHEAD: usize = 24;

/// In-memory [`BlockCache`] with LRU eviction against a byte budget.
pub struct TtlCache {
    map: HashMap<Vec<u8>, Entry>,
    counter: u64,
    used_bytes: usize,
    capacity_bytes: usize,
}

impl TtlCache {
    /// Create a cache bounded to roughly `capacity_bytes`.
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            map: HashMap::new(),
            counter: 0,
            used_bytes: 0,
            capacity_bytes: capacity_bytes.max(1024),
        }
    }

    /// Number of live entries (expired ones may still be counted until
    /// touched).
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Approximate bytes in use.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    fn entry_size(key: &[u8], value: &[u8]) -> usize {
        key.len() + value.len() + ENTRY_OVERHEAD
    }

    fn remove(&mut self, key: &[u8]) -> bool {
        if let Some(entry) = self.map.remove(key) {
            self.used_bytes = self
                .used_bytes
                .saturating_sub(Self::entry_size(key, &entry.value));
            true
        } else {
            false
        }
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .map
            .iter()
            .min_by_key(|(_, entry)| entry.order)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.remove(&key);
        }
    }
}

impl BlockCache for TtlCache {
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();

        let expired = match self.map.get_mut(key) {
            None => return Ok(None),
            Some(entry) if entry.expired(now) => true,
            Some(entry) => {
                self.counter += 1;
                entry.order = self.counter;
                false
            }
        };

        if expired {
            self.remove(key);
            return Ok(None);
        }

        Ok(self.map.get(key).map(|entry| entry.value.clone()))
    }

    fn set(&mut self, key: &[u8], value: &[u8], ttl_secs: u64) -> Result<(), CacheError> {
        let size = Self::entry_size(key, value);
        if size > self.capacity_bytes / 1024 {
            return Err(CacheError::EntryTooLarge);
        }

        self.remove(key);

        self.counter += 1;
        let expires_at = if ttl_secs == 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_secs(ttl_secs))
        };

        self.map.insert(
            key.to_vec(),
            Entry {
                value: value.to_vec(),
                expires_at,
                order: self.counter,
            },
        );
        self.used_bytes += size;

        while self.used_bytes > self.capacity_bytes && self.map.len() > 1 {
            self.evict_lru();
        }

        Ok(())
    }

    fn del(&mut self, key: &[u8]) -> bool {
        self.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Capacity giving a per-entry limit of 1 KiB
    const CAPACITY: usize = 1024 * 1024;

    #[test]
    fn set_get_del_roundtrip() {
        let mut cache = TtlCache::new(CAPACITY);
        assert_eq!(cache.get(b"k").unwrap(), None);

        cache.set(b"k", b"v", 0).unwrap();
        assert_eq!(cache.get(b"k").unwrap(), Some(b"v".to_vec()));

        assert!(cache.del(b"k"));
        assert!(!cache.del(b"k"));
        assert_eq!(cache.get(b"k").unwrap(), None);
        assert_eq!(cache.used_bytes(), 0);
    }

    #[test]
    fn zero_ttl_never_expires() {
        let mut cache = TtlCache::new(CAPACITY);
        cache.set(b"k", b"v", 0).unwrap();
        assert!(cache.map[b"k".as_slice()].expires_at.is_none());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let mut cache = TtlCache::new(CAPACITY);
        cache.set(b"k", b"v", 1).unwrap();
        assert!(cache.get(b"k").unwrap().is_some());

        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(cache.get(b"k").unwrap(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn oversized_entries_are_rejected() {
        let mut cache = TtlCache::new(CAPACITY);
        let oversized = vec![0u8; CAPACITY / 1024 + 1];
        assert_eq!(
            cache.set(b"k", &oversized, 0),
            Err(CacheError::EntryTooLarge)
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn lru_eviction_respects_recency() {
        // Small budget so a few thousand entries overflow it
        let budget = 64 * 1024;
        let mut cache = TtlCache::new(budget);

        for i in 0..3000 {
            cache.set(format!("key-{i}").as_bytes(), b"v", 0).unwrap();
            if i == 1000 {
                // Refresh key-0 so it outlives its insertion order
                assert!(cache.get(b"key-0").unwrap().is_some());
            }
        }

        assert!(cache.len() < 3000, "no eviction happened");
        assert!(cache.used_bytes() <= budget);
        assert!(cache.get(b"key-0").unwrap().is_some(), "refreshed key evicted");
        assert!(cache.get(b"key-1").unwrap().is_none(), "oldest key kept");
        assert!(cache.get(b"key-2999").unwrap().is_some(), "newest key evicted");
    }

    #[test]
    fn overwrite_replaces_size_accounting() {
        let mut cache = TtlCache::new(CAPACITY);
        cache.set(b"k", &[0u8; 100], 0).unwrap();
        let first = cache.used_bytes();

        cache.set(b"k", &[0u8; 10], 0).unwrap();
        assert!(cache.used_bytes() < first);
        assert_eq!(cache.len(), 1);
    }
}
