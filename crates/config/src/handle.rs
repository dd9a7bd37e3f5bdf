//! Live configuration slot
//!
//! The rule set is the only shared mutable state between the reload
//! worker and the request path. It lives behind an `RwLock<Arc<Config>>`:
//! readers clone the `Arc` once at the start of a payload and use that
//! snapshot for the whole request, writers build a complete new config
//! and swap the pointer. No reader ever observes a partially updated
//! rule set.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::Config;

/// Atomically swappable configuration slot.
pub struct ConfigHandle {
    inner: RwLock<Arc<Config>>,
}

impl ConfigHandle {
    /// Publish the initial configuration.
    pub fn new(config: Config) -> Self {
        Self {
            inner: RwLock::new(Arc::new(config)),
        }
    }

    /// Take a consistent snapshot of the live configuration.
    pub fn snapshot(&self) -> Arc<Config> {
        self.inner.read().clone()
    }

    /// Replace the live configuration.
    pub fn swap(&self, config: Config) {
        *self.inner.write() = Arc::new(config);
    }
}
