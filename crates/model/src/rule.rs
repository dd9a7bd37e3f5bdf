//! Rules - declarative alert reactions
//!
//! A [`Rule`] couples a match predicate ([`Conditions`]) with an ordered
//! list of [`Action`]s. Rules are deserialized from configuration and then
//! prepared exactly once: defaults filled, common parameters merged,
//! executors resolved and validated, condition values compiled.
//!
//! # Regex classification
//!
//! A configured condition value becomes a regex only when it parses as a
//! regex AND contains at least one capturing group; everything else stays
//! an exact match. Without the capturing-group requirement a literal like
//! `firing` would silently turn into a (trivial) regex. After compilation
//! the exact and regex maps never share a key.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use reflex_executor::{ExecutorError, ExecutorRegistry, Params, TaskExecutor};

/// Alert status a rule reacts to by default.
pub const STATUS_FIRING: &str = "firing";
/// Alert status of a resolved alert.
pub const STATUS_RESOLVED: &str = "resolved";

/// Errors produced while preparing rules.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The configuration contains no rules at all
    #[error("empty rules list")]
    EmptyRules,

    /// A rule has no name
    #[error("empty rule name")]
    EmptyName,

    /// A rule has no actions
    #[error("empty actions")]
    EmptyActions,

    /// `alert_status` is neither `firing` nor `resolved`
    #[error("invalid alert status: should be firing or resolved")]
    InvalidAlertStatus,

    /// No executors registered at all
    #[error("empty executors")]
    EmptyExecutors,

    /// An action without an executor name
    #[error("empty executor")]
    EmptyExecutor,

    /// An action references an unregistered executor
    #[error("executor {0} not found")]
    UnknownExecutor(String),

    /// A label condition has an empty key or value
    #[error("alert label validation error: {0}")]
    InvalidLabelCondition(String),

    /// An annotation condition has an empty key or value
    #[error("alert annotation validation error: {0}")]
    InvalidAnnotationCondition(String),

    /// Executor rejected the action parameters
    #[error("invalid parameters for executor {executor}: {source}")]
    InvalidParameters {
        /// Executor name from the action
        executor: String,
        /// Validation failure
        source: ExecutorError,
    },
}

/// One mapping-style matcher over alert labels or annotations.
///
/// Deserialized from a plain `key: value` map; [`Matcher::compile`] moves
/// regex-classified values into the compiled map.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "BTreeMap<String, String>")]
pub struct Matcher {
    exact: BTreeMap<String, String>,
    regex: BTreeMap<String, Regex>,
}

impl From<BTreeMap<String, String>> for Matcher {
    fn from(exact: BTreeMap<String, String>) -> Self {
        Self {
            exact,
            regex: BTreeMap::new(),
        }
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        self.exact == other.exact
            && self.regex.len() == other.regex.len()
            && self
                .regex
                .iter()
                .zip(other.regex.iter())
                .all(|((ka, ra), (kb, rb))| ka == kb && ra.as_str() == rb.as_str())
    }
}

impl Matcher {
    /// Check that every key and value is non-empty.
    fn validate(&self) -> Result<(), String> {
        for (key, value) in &self.exact {
            if key.is_empty() {
                return Err("key is empty".to_owned());
            }
            if value.is_empty() {
                return Err(format!("value for key {key} is empty"));
            }
        }
        Ok(())
    }

    /// Split configured values into exact matches and compiled regexes.
    fn compile(&mut self) {
        let raw = std::mem::take(&mut self.exact);
        for (key, value) in raw {
            match Regex::new(&value) {
                // captures_len() counts the implicit whole-match group
                Ok(re) if re.captures_len() > 1 => {
                    self.regex.insert(key, re);
                }
                _ => {
                    self.exact.insert(key, value);
                }
            }
        }
    }

    /// Evaluate the matcher against one alert map.
    pub fn matches(&self, map: &BTreeMap<String, String>) -> bool {
        for (key, expected) in &self.exact {
            match map.get(key) {
                Some(value) if value == expected => {}
                _ => return false,
            }
        }

        for (key, re) in &self.regex {
            match map.get(key) {
                Some(value) if re.is_match(value) => {}
                _ => return false,
            }
        }

        true
    }

    /// Exact-match entries (post-compile: regex-classified values removed).
    pub fn exact(&self) -> &BTreeMap<String, String> {
        &self.exact
    }

    /// Compiled regex entries.
    pub fn regex(&self) -> &BTreeMap<String, Regex> {
        &self.regex
    }
}

/// Match predicate of one rule.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Conditions {
    /// Alert status to match; empty until prepare fills in `firing`.
    pub alert_status: String,

    /// Matcher over alert labels.
    pub alert_labels: Matcher,

    /// Matcher over alert annotations.
    pub alert_annotations: Matcher,
}

/// A single executor invocation specification inside a rule.
#[derive(Clone, Deserialize)]
pub struct Action {
    /// Executor type name (resolved case-insensitively).
    pub executor: String,

    /// Optional name of a shared parameter bundle to merge in.
    #[serde(default)]
    pub common_parameters: String,

    /// Executor-specific parameters.
    #[serde(default)]
    pub parameters: Params,

    /// Block duration after a successful execution (zero = no blocking).
    #[serde(default, with = "humantime_serde")]
    pub block: Duration,

    /// Resolved executor handle; populated by [`prepare_rules`].
    #[serde(skip)]
    pub task_executor: Option<Arc<dyn TaskExecutor>>,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("executor", &self.executor)
            .field("common_parameters", &self.common_parameters)
            .field("parameters", &self.parameters)
            .field("block", &self.block)
            .field("resolved", &self.task_executor.is_some())
            .finish()
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        // The resolved handle is derived state, not configuration
        self.executor == other.executor
            && self.common_parameters == other.common_parameters
            && self.parameters == other.parameters
            && self.block == other.block
    }
}

/// A named match-and-react template from the configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Rule {
    /// Rule name, used in logs and metric labels.
    pub name: String,

    /// Match predicate.
    #[serde(default)]
    pub conditions: Conditions,

    /// Ordered actions; execution order within a task group.
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Rule {
    fn validate_uncompiled(&self) -> Result<(), RuleError> {
        if self.actions.is_empty() {
            return Err(RuleError::EmptyActions);
        }
        if self.name.is_empty() {
            return Err(RuleError::EmptyName);
        }

        let status = &self.conditions.alert_status;
        if !status.is_empty() && status != STATUS_FIRING && status != STATUS_RESOLVED {
            return Err(RuleError::InvalidAlertStatus);
        }

        self.conditions
            .alert_labels
            .validate()
            .map_err(RuleError::InvalidLabelCondition)?;
        self.conditions
            .alert_annotations
            .validate()
            .map_err(RuleError::InvalidAnnotationCondition)?;

        Ok(())
    }

    fn merge_common_parameters(&mut self, common: &BTreeMap<String, Params>) {
        if common.is_empty() {
            return;
        }

        for action in &mut self.actions {
            if action.common_parameters.is_empty() {
                continue;
            }
            let Some(bundle) = common.get(&action.common_parameters) else {
                continue;
            };
            for (param, value) in bundle {
                // Caller-supplied values always win over the bundle
                action
                    .parameters
                    .entry(param.clone())
                    .or_insert_with(|| value.clone());
            }
        }
    }

    fn prepare_task_executors(&mut self, registry: &ExecutorRegistry) -> Result<(), RuleError> {
        if registry.is_empty() {
            return Err(RuleError::EmptyExecutors);
        }

        for action in &mut self.actions {
            if action.executor.is_empty() {
                return Err(RuleError::EmptyExecutor);
            }

            let executor = registry
                .get(&action.executor)
                .ok_or_else(|| RuleError::UnknownExecutor(action.executor.clone()))?;

            executor
                .validate_parameters(&action.parameters)
                .map_err(|source| RuleError::InvalidParameters {
                    executor: action.executor.clone(),
                    source,
                })?;

            action.task_executor = Some(executor);
        }

        Ok(())
    }

    fn compile(&mut self) {
        self.conditions.alert_labels.compile();
        self.conditions.alert_annotations.compile();
    }
}

/// Prepare deserialized rules for matching.
///
/// Validates every rule, fills the default alert status, merges common
/// parameter bundles, resolves and validates executors, and compiles the
/// condition matchers. After a successful return every action carries a
/// resolved `task_executor` and no matcher key appears in both the exact
/// and regex maps.
pub fn prepare_rules(
    rules: &mut [Rule],
    common_parameters: &BTreeMap<String, Params>,
    registry: &ExecutorRegistry,
) -> Result<(), RuleError> {
    if rules.is_empty() {
        return Err(RuleError::EmptyRules);
    }

    for rule in rules.iter_mut() {
        rule.validate_uncompiled()?;

        if rule.conditions.alert_status.is_empty() {
            rule.conditions.alert_status = STATUS_FIRING.to_owned();
        }

        rule.merge_common_parameters(common_parameters);
        rule.prepare_task_executors(registry)?;
        rule.compile();
    }

    Ok(())
}

#[cfg(test)]
#[path = "rule_test.rs"]
mod tests;
