//! Jenkins executor - trigger a job and wait for its result
//!
//! # Parameters
//!
//! | Name                       | Type    | Default |
//! |----------------------------|---------|---------|
//! | `endpoint`                 | string  | required |
//! | `login`                    | string  | required |
//! | `password`                 | string  | required |
//! | `job`                      | string  | required |
//! | `job parameter <Name>`     | string  | -       |
//! | `state_refresh_delay`      | string  | `15s`   |
//! | `secure_interations_limit` | integer | `1000`  |
//!
//! Execution triggers `buildWithParameters`, then polls the queue item
//! until Jenkins assigns a build number and the build leaves the
//! `building` state. Polling is bounded by `secure_interations_limit`;
//! exceeding it fails the task with "secure iterations limit exceed",
//! a non-success build result with "build failed".
//!
//! The fingerprint covers the job name and all job parameters sorted by
//! name.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::hash::md5_hex;
use crate::params::{optional_string, prefixed_strings, require_string, Params};
use crate::{ExecutorError, Result, Task, TaskExecutor, TaskMeta};

const PARAM_ENDPOINT: &str = "endpoint";
const PARAM_LOGIN: &str = "login";
const PARAM_PASSWORD: &str = "password";
const PARAM_JOB: &str = "job";
const PARAM_JOB_PARAMETER_PREFIX: &str = "job parameter ";
const PARAM_STATE_REFRESH_DELAY: &str = "state_refresh_delay";
const PARAM_SECURE_ITERATIONS_LIMIT: &str = "secure_interations_limit";

const REQUIRED_STRING_PARAMETERS: [&str; 4] =
    [PARAM_ENDPOINT, PARAM_LOGIN, PARAM_PASSWORD, PARAM_JOB];

const DEFAULT_STATE_REFRESH_DELAY: Duration = Duration::from_secs(15);
const DEFAULT_SECURE_BUILD_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_SECURE_ITERATIONS_LIMIT: usize = 1000;

const STATUS_SUCCESS: &str = "SUCCESS";

/// Executor for Jenkins job triggers.
pub struct JenkinsExecutor {
    client: Client,
}

impl JenkinsExecutor {
    /// Create the Jenkins executor with a shared client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for JenkinsExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskExecutor for JenkinsExecutor {
    fn name(&self) -> &'static str {
        "jenkins"
    }

    fn validate_parameters(&self, params: &Params) -> Result<()> {
        for required in REQUIRED_STRING_PARAMETERS {
            require_string(params, required)?;
        }

        for (key, value) in params {
            if key.starts_with(PARAM_JOB_PARAMETER_PREFIX) && !value.is_string() {
                return Err(ExecutorError::InvalidParameter {
                    param: key.clone(),
                    expected: "string",
                });
            }
        }

        Ok(())
    }

    fn new_task(&self, meta: TaskMeta, params: &Params) -> Box<dyn Task> {
        let state_refresh_delay = optional_string(params, PARAM_STATE_REFRESH_DELAY)
            .and_then(|s| humantime::parse_duration(s).ok())
            .unwrap_or(DEFAULT_STATE_REFRESH_DELAY);

        let secure_iterations_limit = params
            .get(PARAM_SECURE_ITERATIONS_LIMIT)
            .and_then(|v| v.as_i64())
            .filter(|limit| *limit > 0)
            .map(|limit| limit as usize)
            .unwrap_or(DEFAULT_SECURE_ITERATIONS_LIMIT);

        Box::new(JenkinsTask {
            meta,
            endpoint: optional_string(params, PARAM_ENDPOINT)
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_owned(),
            login: optional_string(params, PARAM_LOGIN).unwrap_or_default().to_owned(),
            password: optional_string(params, PARAM_PASSWORD)
                .unwrap_or_default()
                .to_owned(),
            job: optional_string(params, PARAM_JOB).unwrap_or_default().to_owned(),
            parameters: prefixed_strings(params, PARAM_JOB_PARAMETER_PREFIX),
            state_refresh_delay,
            secure_build_delay: DEFAULT_SECURE_BUILD_DELAY,
            secure_iterations_limit,
            client: self.client.clone(),
        })
    }
}

/// Queue item state, populated once Jenkins schedules the build.
#[derive(Debug, Deserialize)]
struct QueueItem {
    executable: Option<Executable>,
}

#[derive(Debug, Deserialize)]
struct Executable {
    number: u64,
}

/// Build state as reported by the build's `api/json` endpoint.
#[derive(Debug, Deserialize)]
struct Build {
    building: bool,
    result: Option<String>,
}

struct JenkinsTask {
    meta: TaskMeta,
    endpoint: String,
    login: String,
    password: String,
    job: String,
    parameters: BTreeMap<String, String>,
    state_refresh_delay: Duration,
    secure_build_delay: Duration,
    secure_iterations_limit: usize,
    client: Client,
}

impl JenkinsTask {
    /// Trigger the job, returning the queue item ID from the Location header.
    async fn trigger(&self) -> Result<u64> {
        let url = format!("{}/job/{}/buildWithParameters", self.endpoint, self.job);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.login, Some(&self.password))
            .form(&self.parameters)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() && !status.is_redirection() {
            return Err(ExecutorError::UnexpectedStatus(status.as_u16()));
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ExecutorError::Jenkins("missing queue location header".to_owned()))?;

        location
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| {
                ExecutorError::Jenkins(format!("unparsable queue location {location}"))
            })
    }

    async fn queued_build_number(&self, queue_id: u64) -> Result<Option<u64>> {
        let url = format!("{}/queue/item/{}/api/json", self.endpoint, queue_id);
        let item: QueueItem = self
            .client
            .get(&url)
            .basic_auth(&self.login, Some(&self.password))
            .send()
            .await?
            .json()
            .await?;

        Ok(item.executable.map(|e| e.number))
    }

    async fn fetch_build(&self, number: u64) -> Result<Build> {
        let url = format!("{}/job/{}/{}/api/json", self.endpoint, self.job, number);
        Ok(self
            .client
            .get(&url)
            .basic_auth(&self.login, Some(&self.password))
            .send()
            .await?
            .json()
            .await?)
    }
}

#[async_trait]
impl Task for JenkinsTask {
    fn meta(&self) -> &TaskMeta {
        &self.meta
    }

    fn executor_name(&self) -> &'static str {
        "jenkins"
    }

    fn details(&self) -> serde_json::Value {
        if self.parameters.is_empty() {
            json!({ "job": self.job })
        } else {
            json!({ "job": self.job, "parameters": self.parameters })
        }
    }

    fn fingerprint(&self) -> String {
        let mut base = self.job.clone();
        for (key, value) in &self.parameters {
            base.push(',');
            base.push_str(key);
            base.push_str(value);
        }
        md5_hex(&base)
    }

    async fn exec(&self) -> Result<()> {
        let queue_id = self.trigger().await?;

        tokio::time::sleep(self.secure_build_delay).await;

        let mut build_number = None;
        for iteration in 0..self.secure_iterations_limit {
            tokio::time::sleep(self.state_refresh_delay).await;

            if build_number.is_none() {
                build_number = self.queued_build_number(queue_id).await?;
            }
            let Some(number) = build_number else {
                continue;
            };

            let build = self.fetch_build(number).await?;
            tracing::debug!(
                event_id = %self.event_id(),
                job = %self.job,
                build = number,
                iteration,
                building = build.building,
                "polled jenkins build state"
            );

            if build.building {
                continue;
            }

            if build.result.as_deref() != Some(STATUS_SUCCESS) {
                return Err(ExecutorError::BuildFailed);
            }
            return Ok(());
        }

        Err(ExecutorError::IterationsLimitExceeded)
    }
}

#[cfg(test)]
#[path = "jenkins_test.rs"]
mod tests;
