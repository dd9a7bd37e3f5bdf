//! Reflex - Metrics
//!
//! Central definition of every Prometheus metric the service emits. Each
//! component calls the helpers here instead of spelling out metric names
//! and label keys; the recorder is installed once at startup and the
//! rendered exposition is served from the webhook server's `/metrics`
//! route.
//!
//! # Naming
//!
//! Metric names keep the `prometheus_alert_webhooker_` prefix of the
//! classic Alertmanager webhook contract so existing dashboards keep
//! working.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Counter: tasks accepted from the webhook, per rule/alert/executor.
pub const INCOME_TASKS: &str = "prometheus_alert_webhooker_income_tasks";

/// Histogram: executed tasks with result and duration in seconds.
pub const EXECUTED_TASKS: &str = "prometheus_alert_webhooker_executed_tasks";

/// Rule name label key.
pub const LABEL_RULE: &str = "rule";
/// Alert name label key.
pub const LABEL_ALERT: &str = "alert";
/// Executor name label key.
pub const LABEL_EXECUTOR: &str = "executor";
/// Exec-gate result label key.
pub const LABEL_RESULT: &str = "result";
/// Error text label key (empty on success).
pub const LABEL_ERROR: &str = "error";

/// Task duration histogram buckets in seconds.
///
/// Shell tasks finish in milliseconds, Jenkins polling can take minutes.
pub const DURATION_BUCKETS: [f64; 10] =
    [0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 600.0];

/// Install the global Prometheus recorder.
///
/// Call once per process, before any metric is recorded. The returned
/// handle renders the exposition text for the `/metrics` route.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets(&DURATION_BUCKETS)?
        .install_recorder()?;

    describe_all();
    tracing::debug!("prometheus metrics recorder installed");

    Ok(handle)
}

/// Register HELP texts for every metric.
pub fn describe_all() {
    describe_counter!(INCOME_TASKS, "Income tasks counter.");
    describe_histogram!(EXECUTED_TASKS, "Tasks with results and duration.");
}

/// Count one task accepted from an inbound payload.
pub fn income_task_inc(rule: &str, alert: &str, executor: &str) {
    counter!(
        INCOME_TASKS,
        LABEL_RULE => rule.to_owned(),
        LABEL_ALERT => alert.to_owned(),
        LABEL_EXECUTOR => executor.to_owned(),
    )
    .increment(1);
}

/// Observe one executed task, regardless of outcome.
///
/// `error` carries the error text, or `None` for the empty label value.
pub fn executed_task_observe(
    rule: &str,
    alert: &str,
    executor: &str,
    result: &str,
    error: Option<&str>,
    duration: Duration,
) {
    histogram!(
        EXECUTED_TASKS,
        LABEL_RULE => rule.to_owned(),
        LABEL_ALERT => alert.to_owned(),
        LABEL_EXECUTOR => executor.to_owned(),
        LABEL_RESULT => result.to_owned(),
        LABEL_ERROR => error.unwrap_or_default().to_owned(),
    )
    .record(duration.as_secs_f64());
}
