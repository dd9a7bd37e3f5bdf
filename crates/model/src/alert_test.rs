use std::sync::Arc;

use async_trait::async_trait;
use reflex_executor::{
    ExecutorRegistry, Params, Task, TaskExecutor, TaskMeta,
};
use serde_json::json;

use super::*;
use crate::rule::prepare_rules;

/// Executor stub that records the rendered parameters into the task.
struct RecordingExecutor;

impl TaskExecutor for RecordingExecutor {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn validate_parameters(&self, _params: &Params) -> reflex_executor::Result<()> {
        Ok(())
    }

    fn new_task(&self, meta: TaskMeta, params: &Params) -> Box<dyn Task> {
        Box::new(RecordingTask {
            meta,
            params: params.clone(),
        })
    }
}

struct RecordingTask {
    meta: TaskMeta,
    params: Params,
}

#[async_trait]
impl Task for RecordingTask {
    fn meta(&self) -> &TaskMeta {
        &self.meta
    }

    fn executor_name(&self) -> &'static str {
        "recording"
    }

    fn details(&self) -> serde_json::Value {
        json!(self.params)
    }

    fn fingerprint(&self) -> String {
        "fp".to_owned()
    }

    async fn exec(&self) -> reflex_executor::Result<()> {
        Ok(())
    }
}

fn registry() -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();
    registry.register(Arc::new(RecordingExecutor));
    registry
}

fn prepared_rules(value: serde_json::Value) -> Vec<Rule> {
    let mut rules: Vec<Rule> = serde_json::from_value(value).unwrap();
    prepare_rules(&mut rules, &Default::default(), &registry()).unwrap();
    rules
}

fn payload() -> Payload {
    serde_json::from_value(json!({
        "receiver": "reflex",
        "status": "firing",
        "alerts": [
            {
                "labels": { "alertname": "InstanceDown", "instance": "host1:9090" },
                "annotations": { "title": "host1 is down" }
            },
            {
                "labels": { "alertname": "DiskFull", "job": "other" },
                "annotations": {}
            }
        ],
        "commonLabels": { "job": "node", "env": "prod" },
        "commonAnnotations": { "runbook": "wiki/node" },
        "externalURL": "http://alertmanager:9093"
    }))
    .unwrap()
}

#[test]
fn payload_merges_common_maps() {
    let alerts = payload().to_alerts();
    assert_eq!(alerts.len(), 2);

    let first = &alerts[0];
    assert_eq!(first.status, "firing");
    assert_eq!(first.name(), "InstanceDown");
    assert_eq!(first.labels["job"], "node");
    assert_eq!(first.labels["env"], "prod");
    assert_eq!(first.annotations["runbook"], "wiki/node");
    assert_eq!(first.annotations["title"], "host1 is down");

    // Per-alert values win over common ones
    let second = &alerts[1];
    assert_eq!(second.labels["job"], "other");
}

#[test]
fn unknown_payload_fields_are_ignored() {
    let payload: Payload =
        serde_json::from_str(r#"{"status":"firing","groupKey":"{}:{}","version":"4"}"#).unwrap();
    assert_eq!(payload.status, "firing");
    assert!(payload.alerts.is_empty());
}

#[test]
fn status_must_match_conditions() {
    let rules = prepared_rules(json!([{
        "name": "restart",
        "conditions": { "alert_status": "resolved" },
        "actions": [{ "executor": "recording" }]
    }]));

    let alerts = payload().to_alerts();
    assert!(to_task_groups(&alerts, &rules, "1a2b").is_empty());
}

#[test]
fn expansion_produces_one_group_per_matching_rule() {
    let rules = prepared_rules(json!([
        {
            "name": "page on instance down",
            "conditions": { "alert_labels": { "alertname": "InstanceDown" } },
            "actions": [
                { "executor": "recording", "parameters": { "msg": "${ANNOTATION_TITLE}" } },
                { "executor": "recording", "parameters": { "target": "${CUT_AFTER_LAST_COLON_LABEL_INSTANCE}" } }
            ]
        },
        {
            "name": "any firing alert",
            "actions": [{ "executor": "recording" }]
        }
    ]));

    let alerts = payload().to_alerts();
    let groups = to_task_groups(&alerts, &rules, "1a2b");

    // InstanceDown matches both rules, DiskFull only the catch-all
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0].len(), 2);

    let first_task = &groups[0][0];
    assert_eq!(first_task.event_id(), "1a2b");
    assert_eq!(first_task.rule(), "page on instance down");
    assert_eq!(first_task.alert(), "InstanceDown");
    assert_eq!(first_task.details()["msg"], "host1 is down");

    let second_task = &groups[0][1];
    assert_eq!(second_task.details()["target"], "host1");

    assert_eq!(groups[2][0].rule(), "any firing alert");
    assert_eq!(groups[2][0].alert(), "DiskFull");
}

#[test]
fn regex_conditions_match_rendered_alerts() {
    let rules = prepared_rules(json!([{
        "name": "port 9090 only",
        "conditions": { "alert_labels": { "instance": r"^(host\d+):9090$" } },
        "actions": [{ "executor": "recording" }]
    }]));

    let alerts = payload().to_alerts();
    let groups = to_task_groups(&alerts, &rules, "1a2b");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0][0].alert(), "InstanceDown");
}
