//! Reflex - Blocker
//!
//! Process-local fingerprint deduplication. A task may run at most once
//! per fingerprint while its entry lives in the cache:
//!
//! ```text
//! block_in_progress(fp)      -- install infinite-TTL entry, atomically
//!   |-- exec ok  --> block_for_ttl(fp, ttl)  -- replace with finite TTL
//!   `-- exec err --> unblock(fp)             -- release immediately
//! ```
//!
//! The infinite-TTL placeholder is what makes the "freshly acquired"
//! signal race-free: collapsing the two phases into one `set(ttl)` would
//! let two workers observe an unblocked fingerprint concurrently.
//!
//! All three operations are serialised by a single mutex so the
//! check-then-set in [`Blocker::block_in_progress`] is atomic.

mod cache;

pub use cache::{BlockCache, CacheError, TtlCache};

use parking_lot::Mutex;
use std::time::Duration;

/// Cache entry never expires until explicitly unblocked.
const FOREVER_TTL: u64 = 0;

/// Sentinel stored under blocked fingerprints.
const BLOCK_VALUE: &[u8] = b"l";

/// Default cache budget: 50 MiB.
pub const DEFAULT_CACHE_SIZE: usize = 50 * 1024 * 1024;

/// Fingerprint deduplication gate over a [`BlockCache`].
pub struct Blocker<C = TtlCache> {
    cache: Mutex<C>,
}

impl Blocker<TtlCache> {
    /// Blocker over the bundled in-memory cache.
    pub fn with_cache_size(capacity_bytes: usize) -> Self {
        Self::new(TtlCache::new(capacity_bytes))
    }
}

impl<C: BlockCache> Blocker<C> {
    /// Wrap a cache in a blocker.
    pub fn new(cache: C) -> Self {
        Self {
            cache: Mutex::new(cache),
        }
    }

    /// Try to acquire the in-progress block for a task.
    ///
    /// Returns `Ok(true)` for exactly one caller per unblocked key: the
    /// entry is installed with an infinite TTL before anyone else can
    /// observe the key as free. An already-blocked key yields
    /// `Ok(false)`; cache errors other than "not found" are surfaced.
    pub fn block_in_progress(
        &self,
        executor: &str,
        fingerprint: &str,
    ) -> Result<bool, CacheError> {
        let mut cache = self.cache.lock();
        let key = block_key(executor, fingerprint);

        match cache.get(&key) {
            Ok(Some(_)) => return Ok(false),
            Ok(None) => {}
            // Some cache backends report missing keys as errors
            Err(err) if err.to_string().contains("not found") => {}
            Err(err) => return Err(err),
        }

        cache.set(&key, BLOCK_VALUE, FOREVER_TTL)?;
        Ok(true)
    }

    /// Replace the in-progress block with a finite TTL after success.
    pub fn block_for_ttl(
        &self,
        executor: &str,
        fingerprint: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut cache = self.cache.lock();
        cache.set(&block_key(executor, fingerprint), BLOCK_VALUE, ttl.as_secs())
    }

    /// Release a block. Releasing an absent key is a no-op.
    pub fn unblock(&self, executor: &str, fingerprint: &str) {
        let mut cache = self.cache.lock();
        let _ = cache.del(&block_key(executor, fingerprint));
    }
}

fn block_key(executor: &str, fingerprint: &str) -> Vec<u8> {
    format!("{executor}_{fingerprint}").into_bytes()
}

#[cfg(test)]
#[path = "blocker_test.rs"]
mod tests;
