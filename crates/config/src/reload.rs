//! Config reload worker
//!
//! Periodically re-fetches the remote configuration and swaps the live
//! rule set when it changed. Started only for remote providers with a
//! non-zero refresh interval.
//!
//! A failed iteration is logged and skipped; the previous good
//! configuration stays live. Startup-only settings (cache size, pool
//! size, runner count) are pinned to their initial values across
//! refreshes - changing them requires a restart.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use reflex_executor::ExecutorRegistry;

use crate::error::Result;
use crate::handle::ConfigHandle;
use crate::source::ConfigSource;
use crate::Config;

/// Background worker refreshing the live configuration.
pub struct ReloadWorker {
    handle: Arc<ConfigHandle>,
    source: Box<dyn ConfigSource>,
    extension: String,
    registry: Arc<ExecutorRegistry>,
    cancel: CancellationToken,
}

impl ReloadWorker {
    /// Create a reload worker over an already-published configuration.
    pub fn new(
        handle: Arc<ConfigHandle>,
        source: Box<dyn ConfigSource>,
        extension: impl Into<String>,
        registry: Arc<ExecutorRegistry>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            handle,
            source,
            extension: extension.into(),
            registry,
            cancel,
        }
    }

    /// Run the refresh loop until cancelled.
    ///
    /// The sleep interval is re-read from the live configuration each
    /// iteration, so a refresh can retune its own cadence. An interval
    /// dropping to zero stops the worker.
    pub async fn run(self) {
        tracing::info!(
            source = %self.source.describe(),
            interval = ?self.handle.snapshot().remote_config_refresh_interval,
            "config reload worker started"
        );

        let mut iteration: u64 = 0;
        loop {
            let interval = self.handle.snapshot().remote_config_refresh_interval;
            if interval.is_zero() {
                tracing::info!("refresh interval is zero, config reload worker stopping");
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            iteration += 1;
            match self.refresh().await {
                Ok(true) => {
                    tracing::info!(iteration, "config refreshed: rules changed");
                }
                Ok(false) => {
                    tracing::debug!(iteration, "config refreshed: no changes");
                }
                Err(error) => {
                    tracing::error!(iteration, error = %error, "config refresh failed");
                }
            }
        }

        tracing::info!("config reload worker stopped");
    }

    /// Fetch, prepare and compare one configuration generation.
    ///
    /// Returns whether the live configuration was swapped. The swap
    /// completes before this returns, so a payload arriving afterwards
    /// observes the new rule set.
    pub async fn refresh(&self) -> Result<bool> {
        let bytes = self.source.fetch().await?;
        let mut incoming = Config::decode(&bytes, &self.extension)?;
        incoming.prepare(&self.registry)?;

        let current = self.handle.snapshot();
        let changed = incoming.rules != current.rules
            || incoming.common_parameters != current.common_parameters
            || incoming.remote_config_refresh_interval
                != current.remote_config_refresh_interval;

        if changed {
            self.handle.swap(Config {
                block_cache_size: current.block_cache_size,
                pool_size: current.pool_size,
                runners: current.runners,
                ..incoming
            });
        }

        Ok(changed)
    }
}

/// Spawn a reload worker as a background task.
pub fn spawn_reload_worker(
    handle: Arc<ConfigHandle>,
    source: Box<dyn ConfigSource>,
    extension: impl Into<String>,
    registry: Arc<ExecutorRegistry>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let worker = ReloadWorker::new(handle, source, extension, registry, cancel);
    tokio::spawn(worker.run())
}
