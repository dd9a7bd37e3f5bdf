//! Telegram executor - send a message through the Bot API
//!
//! # Parameters
//!
//! | Name        | Type    | Required |
//! |-------------|---------|----------|
//! | `bot_token` | string  | yes      |
//! | `chat_id`   | integer | yes      |
//! | `message`   | string  | yes      |
//!
//! The fingerprint covers the chat ID and the message text, so the same
//! notification to two chats produces two independent tasks.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::hash::md5_hex;
use crate::params::{optional_string, require_string, Params};
use crate::{ExecutorError, Result, Task, TaskExecutor, TaskMeta};

const PARAM_BOT_TOKEN: &str = "bot_token";
const PARAM_CHAT_ID: &str = "chat_id";
const PARAM_MESSAGE: &str = "message";

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Executor for Telegram Bot API messages.
pub struct TelegramExecutor {
    client: Client,
    api_base: String,
}

impl TelegramExecutor {
    /// Create the Telegram executor against the public Bot API.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_base: DEFAULT_API_BASE.to_owned(),
        }
    }
}

impl Default for TelegramExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskExecutor for TelegramExecutor {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn validate_parameters(&self, params: &Params) -> Result<()> {
        require_string(params, PARAM_BOT_TOKEN)?;
        require_string(params, PARAM_MESSAGE)?;

        match params.get(PARAM_CHAT_ID) {
            None => Err(ExecutorError::MissingParameter(PARAM_CHAT_ID.to_owned())),
            Some(value) if value.as_i64().is_none() => Err(ExecutorError::InvalidParameter {
                param: PARAM_CHAT_ID.to_owned(),
                expected: "number",
            }),
            Some(_) => Ok(()),
        }
    }

    fn new_task(&self, meta: TaskMeta, params: &Params) -> Box<dyn Task> {
        Box::new(TelegramTask {
            meta,
            token: optional_string(params, PARAM_BOT_TOKEN)
                .unwrap_or_default()
                .to_owned(),
            chat_id: params
                .get(PARAM_CHAT_ID)
                .and_then(|v| v.as_i64())
                .unwrap_or_default(),
            message: optional_string(params, PARAM_MESSAGE)
                .unwrap_or_default()
                .to_owned(),
            api_base: self.api_base.clone(),
            client: self.client.clone(),
        })
    }
}

/// Subset of the Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

struct TelegramTask {
    meta: TaskMeta,
    token: String,
    chat_id: i64,
    message: String,
    api_base: String,
    client: Client,
}

#[async_trait]
impl Task for TelegramTask {
    fn meta(&self) -> &TaskMeta {
        &self.meta
    }

    fn executor_name(&self) -> &'static str {
        "telegram"
    }

    fn details(&self) -> serde_json::Value {
        json!({ "chat_id": self.chat_id, "message": self.message })
    }

    fn fingerprint(&self) -> String {
        md5_hex(&format!("{}|{}", self.chat_id, self.message))
    }

    async fn exec(&self) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let response: ApiResponse = self
            .client
            .post(&url)
            .json(&json!({ "chat_id": self.chat_id, "text": self.message }))
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(ExecutorError::Telegram(
                response
                    .description
                    .unwrap_or_else(|| "request rejected".to_owned()),
            ));
        }

        Ok(())
    }
}
