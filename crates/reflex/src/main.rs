//! Reflex - alert-driven remediation dispatcher
//!
//! Receives Prometheus Alertmanager webhooks, matches them against a
//! declarative rule set and dispatches remediation tasks (shell, HTTP,
//! Jenkins, Telegram) to a worker pool with fingerprint deduplication.
//!
//! # Usage
//!
//! ```bash
//! # Local config file
//! reflex -c config/config.yaml
//!
//! # Remote config with live reload
//! reflex -p consul -c http://consul:8500/v1/kv/reflex/config.yaml
//!
//! # Verbose logging on a custom port
//! reflex -l :9095 -v
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reflex_blocker::Blocker;
use reflex_config::{
    load, parse_path, source_for, spawn_reload_worker, ConfigHandle, Provider, DEFAULT_EXTENSION,
};
use reflex_executor::{default_registry, TaskGroup};
use reflex_runner::{spawn_runners, system_clock};
use reflex_webhook::{AppState, WebhookServer};

/// Dispatch remediation tasks for Prometheus Alertmanager alerts
#[derive(Parser, Debug)]
#[command(name = "reflex", version, about, long_about = None)]
struct Cli {
    /// HTTP address to listen on
    #[arg(short = 'l', long = "listen", default_value = ":8080")]
    listen: String,

    /// Config provider: file, etcd, consul
    #[arg(short = 'p', long = "provider", default_value = "file")]
    provider: Provider,

    /// Path to the config file, or its URL for remote providers
    #[arg(short = 'c', long = "config", default_value = "config/config.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %cli.listen,
        provider = %cli.provider,
        config = %cli.config,
        "starting reflex"
    );

    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let registry = Arc::new(default_registry());

    // Resolve and load the initial configuration; errors here are fatal
    let location = parse_path(&cli.config, DEFAULT_EXTENSION, cli.provider)?;
    let source = source_for(cli.provider, &location)?;
    let config = load(source.as_ref(), &location.extension, &registry)
        .await
        .context("failed to prepare configuration")?;

    info!(
        rules = config.rules.len(),
        runners = config.runners,
        pool_size = config.pool_size,
        block_cache_size = config.block_cache_size,
        "configuration prepared"
    );

    let prometheus = reflex_metrics::install_recorder()?;

    let cancel = CancellationToken::new();

    // The task-group queue: webhook handlers push, runners pop
    let (tasks_tx, tasks_rx) = crossfire::mpmc::bounded_async::<TaskGroup>(config.pool_size);

    let blocker = Arc::new(Blocker::with_cache_size(config.block_cache_size));
    let runner_handles = spawn_runners(
        config.runners,
        tasks_rx,
        blocker,
        system_clock(),
        cancel.clone(),
    );

    let refresh_interval = config.remote_config_refresh_interval;
    let handle = Arc::new(ConfigHandle::new(config));

    let reload_handle = if cli.provider.is_remote() && !refresh_interval.is_zero() {
        Some(spawn_reload_worker(
            Arc::clone(&handle),
            source,
            location.extension.clone(),
            Arc::clone(&registry),
            cancel.clone(),
        ))
    } else {
        None
    };

    // Shut down on ctrl-c
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    let server = WebhookServer::new(
        cli.listen,
        AppState {
            config: handle,
            tasks_tx,
            prometheus,
        },
    );
    server.run(cancel.clone()).await?;

    // Server is down: stop producers, let runners drain the queue
    cancel.cancel();
    for handle in runner_handles {
        let _ = handle.await;
    }
    if let Some(reload) = reload_handle {
        let _ = reload.await;
    }

    info!("reflex shutdown complete");
    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    Ok(())
}
