//! Action parameters - a heterogeneous string-keyed map
//!
//! On-disk `parameters` blocks mix strings, numbers, booleans and sequences.
//! They are decoded once into [`ParamValue`] and executors downcast in
//! `validate_parameters` / `new_task`; untyped bags never reach the hot path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ExecutorError;

/// Ordered parameter map of one action.
///
/// A `BTreeMap` keeps iteration deterministic for logging and fingerprints.
pub type Params = BTreeMap<String, ParamValue>;

/// A single action parameter value.
///
/// Deserialized untagged: `true` is a bool, `5` an integer, `5.0` a float,
/// anything quoted a string, `[..]` a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean scalar
    Bool(bool),
    /// Integer scalar
    Integer(i64),
    /// Floating-point scalar
    Float(f64),
    /// String scalar (the only kind placeholders are rendered into)
    String(String),
    /// Sequence of values
    Sequence(Vec<ParamValue>),
}

impl ParamValue {
    /// Borrow as a string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to an integer. Floats are truncated, matching the loose
    /// numeric typing of YAML/JSON decoders.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(n) => Some(*n),
            ParamValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Borrow as a sequence, if this is a sequence value.
    pub fn as_sequence(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::Sequence(values) => Some(values),
            _ => None,
        }
    }

    /// True when this value is a string.
    pub fn is_string(&self) -> bool {
        matches!(self, ParamValue::String(_))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

/// Fetch a required string parameter.
pub fn require_string<'a>(params: &'a Params, key: &str) -> Result<&'a str, ExecutorError> {
    match params.get(key) {
        None => Err(ExecutorError::MissingParameter(key.to_owned())),
        Some(value) => value.as_str().ok_or(ExecutorError::InvalidParameter {
            param: key.to_owned(),
            expected: "string",
        }),
    }
}

/// Check that a parameter, when present, is a string.
pub fn check_optional_string(params: &Params, key: &str) -> Result<(), ExecutorError> {
    match params.get(key) {
        Some(value) if !value.is_string() => Err(ExecutorError::InvalidParameter {
            param: key.to_owned(),
            expected: "string",
        }),
        _ => Ok(()),
    }
}

/// Fetch an optional string parameter.
pub fn optional_string<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).and_then(ParamValue::as_str)
}

/// Collect `"<prefix> <name>"`-style parameters into a name -> value map.
///
/// Used for `header <Name>` (http) and `job parameter <Name>` (jenkins)
/// conventions. Non-string values are skipped.
pub fn prefixed_strings(params: &Params, prefix: &str) -> BTreeMap<String, String> {
    params
        .iter()
        .filter_map(|(key, value)| {
            let name = key.strip_prefix(prefix)?.trim();
            let value = value.as_str()?;
            Some((name.to_owned(), value.to_owned()))
        })
        .collect()
}
