//! HTTP route handlers

use std::sync::Arc;
use std::time::SystemTime;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use reflex_model::{event_id, to_task_groups, Payload};

use crate::AppState;

/// POST /webhooker - ingest one Alertmanager payload.
///
/// Always returns 200: delivery problems are the sender's concern only
/// at the transport level, and a malformed body is dropped without
/// partial processing.
pub async fn webhooker(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    let payload: Payload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::debug!(error = %error, "discarding undecodable payload");
            return StatusCode::OK;
        }
    };

    let event_id = event_id(SystemTime::now());
    let snapshot = state.config.snapshot();

    let alerts = payload.to_alerts();
    let groups = to_task_groups(&alerts, &snapshot.rules, &event_id);

    if groups.is_empty() {
        tracing::debug!(
            event_id = %event_id,
            payload = %json!(payload),
            "payload received, no tasks for it"
        );
        return StatusCode::OK;
    }

    let summaries: Vec<_> = groups.iter().map(reflex_executor::group_details).collect();
    tracing::debug!(
        event_id = %event_id,
        payload = %json!(payload),
        tasks = %serde_json::Value::Array(summaries),
        "payload received, task groups prepared"
    );

    for group in groups {
        // Label sets survive the send so the counter can tick afterwards
        let labels: Vec<_> = group
            .iter()
            .map(|task| {
                (
                    task.rule().to_owned(),
                    task.alert().to_owned(),
                    task.executor_name(),
                )
            })
            .collect();

        // Blocks when the queue is full: backpressure towards the sender
        if state.tasks_tx.send(group).await.is_err() {
            tracing::error!(event_id = %event_id, "task queue closed, dropping remaining groups");
            break;
        }

        for (rule, alert, executor) in labels {
            reflex_metrics::income_task_inc(&rule, &alert, executor);
        }
    }

    tracing::debug!(event_id = %event_id, "all task groups queued");
    StatusCode::OK
}

/// GET /metrics - Prometheus exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus.render(),
    )
        .into_response()
}

/// GET /health - liveness probe.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
