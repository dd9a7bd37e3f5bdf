use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;

#[test]
fn first_caller_acquires_the_block() {
    let blocker = Blocker::with_cache_size(DEFAULT_CACHE_SIZE);

    assert!(blocker.block_in_progress("shell", "fp").unwrap());
    assert!(!blocker.block_in_progress("shell", "fp").unwrap());

    // Keys are scoped per executor
    assert!(blocker.block_in_progress("http", "fp").unwrap());
}

#[test]
fn unblock_releases_and_is_idempotent() {
    let blocker = Blocker::with_cache_size(DEFAULT_CACHE_SIZE);

    assert!(blocker.block_in_progress("shell", "fp").unwrap());
    blocker.unblock("shell", "fp");
    blocker.unblock("shell", "fp");

    assert!(blocker.block_in_progress("shell", "fp").unwrap());
}

#[test]
fn finite_ttl_expires() {
    let blocker = Blocker::with_cache_size(DEFAULT_CACHE_SIZE);

    assert!(blocker.block_in_progress("shell", "fp").unwrap());
    blocker
        .block_for_ttl("shell", "fp", Duration::from_secs(1))
        .unwrap();
    assert!(!blocker.block_in_progress("shell", "fp").unwrap());

    std::thread::sleep(Duration::from_millis(1100));
    assert!(blocker.block_in_progress("shell", "fp").unwrap());
}

#[test]
fn concurrent_block_in_progress_has_exactly_one_winner() {
    let blocker = Blocker::with_cache_size(DEFAULT_CACHE_SIZE);
    let acquired = AtomicUsize::new(0);
    let rejected = AtomicUsize::new(0);
    let errors = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..1000 {
            scope.spawn(|| match blocker.block_in_progress("shell", "k") {
                Ok(true) => {
                    acquired.fetch_add(1, Ordering::SeqCst);
                }
                Ok(false) => {
                    rejected.fetch_add(1, Ordering::SeqCst);
                }
                Err(_) => {
                    errors.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(acquired.load(Ordering::SeqCst), 1);
    assert_eq!(rejected.load(Ordering::SeqCst), 999);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}

/// Cache stub reporting missing keys as "not found" errors, the way
/// transport-backed caches do.
struct NotFoundCache {
    inner: TtlCache,
}

impl BlockCache for NotFoundCache {
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, CacheError> {
        match self.inner.get(key)? {
            Some(value) => Ok(Some(value)),
            None => Err(CacheError::Backend("key not found".to_owned())),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8], ttl_secs: u64) -> Result<(), CacheError> {
        self.inner.set(key, value, ttl_secs)
    }

    fn del(&mut self, key: &[u8]) -> bool {
        self.inner.del(key)
    }
}

#[test]
fn not_found_errors_mean_absence() {
    let blocker = Blocker::new(NotFoundCache {
        inner: TtlCache::new(DEFAULT_CACHE_SIZE),
    });

    assert!(blocker.block_in_progress("shell", "fp").unwrap());
    assert!(!blocker.block_in_progress("shell", "fp").unwrap());
}

/// Cache stub that always fails.
struct BrokenCache;

impl BlockCache for BrokenCache {
    fn get(&mut self, _key: &[u8]) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Backend("connection reset".to_owned()))
    }

    fn set(&mut self, _key: &[u8], _value: &[u8], _ttl_secs: u64) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection reset".to_owned()))
    }

    fn del(&mut self, _key: &[u8]) -> bool {
        false
    }
}

#[test]
fn other_cache_errors_propagate() {
    let blocker = Blocker::new(BrokenCache);
    assert!(blocker.block_in_progress("shell", "fp").is_err());
    assert!(blocker
        .block_for_ttl("shell", "fp", Duration::from_secs(1))
        .is_err());
    // Unblock stays best-effort
    blocker.unblock("shell", "fp");
}
