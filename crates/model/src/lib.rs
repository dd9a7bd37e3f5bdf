//! Reflex - Domain model
//!
//! The types flowing between ingestion and execution:
//!
//! ```text
//! Payload --> [Alert] --match--> Rule --render--> TaskGroup
//! ```
//!
//! A [`Payload`] is one Alertmanager webhook body. It normalises into
//! [`Alert`]s (common labels/annotations merged with per-alert overlays),
//! which are matched against prepared [`Rule`]s; every match expands into
//! one task group via the rule's actions.

mod alert;
mod event;
mod render;
mod rule;

pub use alert::{to_task_groups, Alert, Payload, PayloadAlert, ALERT_NAME_LABEL};
pub use event::event_id;
pub use render::render_params;
pub use rule::{
    prepare_rules, Action, Conditions, Matcher, Rule, RuleError, STATUS_FIRING, STATUS_RESOLVED,
};

/// Result type for rule preparation.
pub type Result<T> = std::result::Result<T, RuleError>;
