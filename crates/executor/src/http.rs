//! HTTP executor - call an arbitrary HTTP endpoint
//!
//! # Parameters
//!
//! | Name                  | Type    | Default |
//! |-----------------------|---------|---------|
//! | `url`                 | string  | required |
//! | `method`              | string  | `GET`   |
//! | `body`                | string  | empty   |
//! | `header <Name>`       | string  | -       |
//! | `timeout`             | string  | `1s`    |
//! | `success_http_status` | integer | `200`   |
//!
//! Any other response status is reported as an error and aborts the
//! enclosing task group.
//!
//! The fingerprint covers method, URL, body and all headers sorted by
//! header name, so header insertion order does not change task identity.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::json;

use crate::hash::md5_hex;
use crate::params::{
    check_optional_string, optional_string, prefixed_strings, require_string, Params,
};
use crate::{ExecutorError, Result, Task, TaskExecutor, TaskMeta};

const PARAM_URL: &str = "url";
const PARAM_METHOD: &str = "method";
const PARAM_BODY: &str = "body";
const PARAM_HEADER_PREFIX: &str = "header ";
const PARAM_TIMEOUT: &str = "timeout";
const PARAM_SUCCESS_STATUS: &str = "success_http_status";

const DEFAULT_METHOD: &str = "GET";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_SUCCESS_STATUS: u16 = 200;

/// Executor for plain HTTP calls.
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    /// Create the HTTP executor with a shared client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HttpExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskExecutor for HttpExecutor {
    fn name(&self) -> &'static str {
        "http"
    }

    fn validate_parameters(&self, params: &Params) -> Result<()> {
        require_string(params, PARAM_URL)?;
        check_optional_string(params, PARAM_METHOD)?;
        check_optional_string(params, PARAM_BODY)?;

        for key in params.keys() {
            if key.starts_with(PARAM_HEADER_PREFIX) {
                check_optional_string(params, key)?;
            }
        }

        Ok(())
    }

    fn new_task(&self, meta: TaskMeta, params: &Params) -> Box<dyn Task> {
        let timeout = optional_string(params, PARAM_TIMEOUT)
            .and_then(|s| humantime::parse_duration(s).ok())
            .unwrap_or(DEFAULT_TIMEOUT);

        let success_status = params
            .get(PARAM_SUCCESS_STATUS)
            .and_then(|v| v.as_i64())
            .filter(|status| *status > 0)
            .map(|status| status as u16)
            .unwrap_or(DEFAULT_SUCCESS_STATUS);

        Box::new(HttpTask {
            meta,
            method: optional_string(params, PARAM_METHOD)
                .unwrap_or(DEFAULT_METHOD)
                .to_owned(),
            url: optional_string(params, PARAM_URL).unwrap_or_default().to_owned(),
            body: optional_string(params, PARAM_BODY).unwrap_or_default().to_owned(),
            headers: prefixed_strings(params, PARAM_HEADER_PREFIX),
            success_status,
            timeout,
            client: self.client.clone(),
        })
    }
}

struct HttpTask {
    meta: TaskMeta,
    method: String,
    url: String,
    body: String,
    headers: BTreeMap<String, String>,
    success_status: u16,
    timeout: Duration,
    client: Client,
}

#[async_trait]
impl Task for HttpTask {
    fn meta(&self) -> &TaskMeta {
        &self.meta
    }

    fn executor_name(&self) -> &'static str {
        "http"
    }

    fn details(&self) -> serde_json::Value {
        let mut details = json!({
            "method": self.method,
            "url": self.url,
        });

        if !self.body.is_empty() {
            details["body"] = json!(self.body);
        }
        if !self.headers.is_empty() {
            details["headers"] = json!(self.headers);
        }

        details
    }

    fn fingerprint(&self) -> String {
        let mut base = format!("{}|{}|{}", self.method, self.url, self.body);
        // BTreeMap iterates in key order, which is the fingerprint contract
        for (key, value) in &self.headers {
            base.push(',');
            base.push_str(key);
            base.push_str(value);
        }
        md5_hex(&base)
    }

    async fn exec(&self) -> Result<()> {
        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|_| ExecutorError::InvalidMethod(self.method.clone()))?;

        let mut request = self
            .client
            .request(method, &self.url)
            .timeout(self.timeout);

        if !self.body.is_empty() {
            request = request.body(self.body.clone());
        }
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        if status != self.success_status {
            return Err(ExecutorError::UnexpectedStatus(status));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
