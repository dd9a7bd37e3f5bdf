//! Reflex - Executor contract
//!
//! Defines the two capability seams the rest of the system is built around:
//!
//! - [`TaskExecutor`] - validates action parameters at config-prepare time
//!   and mints [`Task`]s for matching alerts
//! - [`Task`] - a concrete, fully rendered unit of work that knows how to
//!   execute itself and how to identify itself (fingerprint) for dedup
//!
//! # Architecture
//!
//! ```text
//! [Config prepare]            [Webhook ingest]              [Runner]
//!   validate_parameters() --> new_task(meta, params) --> task.exec()
//!                                      |
//!                                fingerprint() --> blocker key
//! ```
//!
//! Bundled executors: `shell`, `http`, `jenkins`, `telegram`. Custom
//! executors are registered through the [`registry::ExecutorRegistry`].

mod error;
mod hash;
pub mod http;
pub mod jenkins;
pub mod params;
pub mod registry;
pub mod shell;
pub mod telegram;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

pub use error::ExecutorError;
pub use hash::md5_hex;
pub use params::{ParamValue, Params};
pub use registry::{default_registry, ExecutorRegistry};

/// Result type for executor operations
pub type Result<T> = std::result::Result<T, ExecutorError>;

/// Identity shared by every task: which event, rule and alert produced it,
/// and for how long a successful execution blocks repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMeta {
    event_id: String,
    rule: String,
    alert: String,
    block_ttl: Duration,
}

impl TaskMeta {
    /// Create task metadata for one (rule, alert) match.
    pub fn new(
        event_id: impl Into<String>,
        rule: impl Into<String>,
        alert: impl Into<String>,
        block_ttl: Duration,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            rule: rule.into(),
            alert: alert.into(),
            block_ttl,
        }
    }
}

/// A concrete, rendered unit of work ready to run.
///
/// Implementations hold a [`TaskMeta`] and expose it through [`Task::meta`];
/// the identity accessors are provided on top of it.
#[async_trait]
pub trait Task: Send + Sync {
    /// Shared identity record.
    fn meta(&self) -> &TaskMeta;

    /// Executor type name, used in logs and metric labels.
    fn executor_name(&self) -> &'static str;

    /// Executor-specific details for structured logging.
    fn details(&self) -> serde_json::Value;

    /// Stable identifier of the operation for deduplication.
    ///
    /// Implementations that fold map entries into the fingerprint must sort
    /// keys first: map iteration order is not part of a task's identity.
    fn fingerprint(&self) -> String;

    /// Execute the task.
    async fn exec(&self) -> Result<()>;

    /// Event ID correlating logs and metrics for one inbound payload.
    fn event_id(&self) -> &str {
        &self.meta().event_id
    }

    /// Name of the rule that produced this task.
    fn rule(&self) -> &str {
        &self.meta().rule
    }

    /// Name of the alert that produced this task.
    fn alert(&self) -> &str {
        &self.meta().alert
    }

    /// Block duration after a successful execution. Zero means the task is
    /// never blocked.
    fn block_ttl(&self) -> Duration {
        self.meta().block_ttl
    }
}

/// Executor capability pair: parameter validation + task construction.
///
/// `validate_parameters` runs once per action when the configuration is
/// prepared; `new_task` runs per matching alert and can rely on the
/// parameters having passed validation.
pub trait TaskExecutor: Send + Sync {
    /// Executor type name used in rule actions (matched case-insensitively).
    fn name(&self) -> &'static str;

    /// Check that the action parameters are complete and well-typed.
    fn validate_parameters(&self, params: &Params) -> Result<()>;

    /// Create a task from rendered parameters.
    fn new_task(&self, meta: TaskMeta, params: &Params) -> Box<dyn Task>;
}

/// An ordered sequence of tasks produced from one (rule, alert) match.
///
/// Execution order within a group is the action order in the rule.
pub type TaskGroup = Vec<Box<dyn Task>>;

/// Structured log fields for a single task.
pub fn task_details(task: &dyn Task) -> serde_json::Value {
    json!({
        "event_id": task.event_id(),
        "rule": task.rule(),
        "alert": task.alert(),
        "executor": task.executor_name(),
        "details": task.details(),
    })
}

/// Structured log fields for a whole task group.
pub fn group_details(group: &TaskGroup) -> serde_json::Value {
    serde_json::Value::Array(group.iter().map(|t| task_details(t.as_ref())).collect())
}
