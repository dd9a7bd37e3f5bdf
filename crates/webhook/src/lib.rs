//! Reflex - Webhook server
//!
//! The HTTP surface of the service.
//!
//! # Endpoints
//!
//! - `POST /webhooker` - Alertmanager webhook ingestion. Always answers
//!   200; malformed payloads are silently discarded (the sender re-fires
//!   on its own timer) and observability is entirely through logs and
//!   metrics.
//! - `GET /metrics` - Prometheus exposition.
//! - `GET /health` - liveness probe.
//!
//! Ingestion takes one configuration snapshot per payload, expands the
//! alerts into task groups against that snapshot and pushes the groups
//! into the bounded queue. A full queue blocks the handler, which is the
//! system's natural backpressure.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use crossfire::MAsyncTx;
use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use reflex_config::ConfigHandle;
use reflex_executor::TaskGroup;

use handlers::{health, metrics, webhooker};

/// Errors from running the webhook server.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Could not bind the listen address
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Listen address
        address: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Server terminated with an error
    #[error("http server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared state of the HTTP handlers.
pub struct AppState {
    /// Live configuration slot; one snapshot is taken per payload.
    pub config: Arc<ConfigHandle>,

    /// Producer side of the task-group queue.
    pub tasks_tx: MAsyncTx<TaskGroup>,

    /// Renderer for the Prometheus exposition.
    pub prometheus: PrometheusHandle,
}

/// The webhook HTTP server.
pub struct WebhookServer {
    listen: String,
    state: Arc<AppState>,
}

impl WebhookServer {
    /// Create a server for the given listen address.
    ///
    /// An address starting with `:` (e.g. `:8080`) binds all interfaces.
    pub fn new(listen: impl Into<String>, state: AppState) -> Self {
        Self {
            listen: listen.into(),
            state: Arc::new(state),
        }
    }

    /// Bind and serve until cancelled.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), WebhookError> {
        let address = normalize_listen(&self.listen);

        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| WebhookError::Bind {
                address: address.clone(),
                source,
            })?;

        tracing::info!(address = %address, "webhook server listening");

        let app = build_router(self.state);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

        tracing::info!("webhook server stopped");
        Ok(())
    }
}

/// Build the axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhooker", post(webhooker))
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .with_state(state)
}

fn normalize_listen(listen: &str) -> String {
    if listen.starts_with(':') {
        format!("0.0.0.0{listen}")
    } else {
        listen.to_owned()
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    cancel.cancelled().await;
}

#[cfg(test)]
#[path = "webhook_test.rs"]
mod tests;
