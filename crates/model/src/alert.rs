//! Alerts - normalised Alertmanager notifications
//!
//! A [`Payload`] mirrors the Alertmanager webhook body. Unknown fields are
//! ignored; the fields of interest are the payload status, the per-alert
//! label/annotation overlays and the shared `commonLabels` /
//! `commonAnnotations` maps. Normalisation merges common and per-alert
//! maps (per-alert values win) into flat [`Alert`]s.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use reflex_executor::{TaskGroup, TaskMeta};

use crate::render::render_params;
use crate::rule::Rule;

/// Label carrying the alert name in Alertmanager payloads.
pub const ALERT_NAME_LABEL: &str = "alertname";

/// One entry of the payload's `alerts` array.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PayloadAlert {
    /// Per-alert labels, overriding `commonLabels` on collision.
    pub labels: BTreeMap<String, String>,

    /// Per-alert annotations, overriding `commonAnnotations` on collision.
    pub annotations: BTreeMap<String, String>,
}

/// Alertmanager webhook payload.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Payload {
    /// Group status: `firing` or `resolved`.
    pub status: String,

    /// Individual alerts of the group.
    pub alerts: Vec<PayloadAlert>,

    /// Labels shared by every alert in the group.
    pub common_labels: BTreeMap<String, String>,

    /// Annotations shared by every alert in the group.
    pub common_annotations: BTreeMap<String, String>,
}

impl Payload {
    /// Normalise the payload into flat alerts.
    pub fn to_alerts(&self) -> Vec<Alert> {
        self.alerts
            .iter()
            .map(|entry| {
                let mut labels = self.common_labels.clone();
                labels.extend(entry.labels.clone());

                let mut annotations = self.common_annotations.clone();
                annotations.extend(entry.annotations.clone());

                Alert {
                    status: self.status.clone(),
                    labels,
                    annotations,
                }
            })
            .collect()
    }
}

/// A normalised notification: status plus merged label/annotation maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Alert {
    /// Alert status, compared against rule conditions.
    pub status: String,

    /// Merged labels.
    pub labels: BTreeMap<String, String>,

    /// Merged annotations.
    pub annotations: BTreeMap<String, String>,
}

impl Alert {
    /// Alert name from the `alertname` label; empty when absent.
    pub fn name(&self) -> &str {
        self.labels
            .get(ALERT_NAME_LABEL)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Evaluate a rule's match predicate against this alert.
    pub fn matches(&self, conditions: &crate::rule::Conditions) -> bool {
        if self.status != conditions.alert_status {
            return false;
        }

        conditions.alert_labels.matches(&self.labels)
            && conditions.alert_annotations.matches(&self.annotations)
    }

    /// Expand this alert against the rule set.
    ///
    /// Returns one task group per matching rule, in rule order.
    fn to_task_groups(&self, rules: &[Rule], event_id: &str) -> Vec<TaskGroup> {
        rules
            .iter()
            .filter(|rule| self.matches(&rule.conditions))
            .map(|rule| self.build_group(rule, event_id))
            .collect()
    }

    fn build_group(&self, rule: &Rule, event_id: &str) -> TaskGroup {
        let mut group = TaskGroup::new();

        for action in &rule.actions {
            // Prepared rules always carry a resolved executor
            let Some(executor) = &action.task_executor else {
                continue;
            };

            let rendered = render_params(&action.parameters, self);
            let meta = TaskMeta::new(event_id, &rule.name, self.name(), action.block);
            group.push(executor.new_task(meta, &rendered));
        }

        group
    }
}

/// Expand a batch of alerts against the rule set.
///
/// Groups are ordered alert-first, then rule order within each alert. No
/// ordering is guaranteed between groups at execution time.
pub fn to_task_groups(alerts: &[Alert], rules: &[Rule], event_id: &str) -> Vec<TaskGroup> {
    alerts
        .iter()
        .flat_map(|alert| alert.to_task_groups(rules, event_id))
        .collect()
}

#[cfg(test)]
#[path = "alert_test.rs"]
mod tests;
