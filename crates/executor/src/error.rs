//! Executor error types

use thiserror::Error;

/// Errors produced by executors during parameter validation and execution.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// A required action parameter is absent
    #[error("required parameter {0} is missing")]
    MissingParameter(String),

    /// A parameter is present but has the wrong type
    #[error("{param} parameter value is not a {expected}")]
    InvalidParameter {
        /// Parameter name
        param: String,
        /// Expected type, e.g. "string"
        expected: &'static str,
    },

    /// The method string does not form a valid HTTP method
    #[error("invalid HTTP method {0}")]
    InvalidMethod(String),

    /// Shell command exited with a non-zero status
    #[error("command exited with status {code}: {stderr}")]
    CommandFailed {
        /// Process exit code (-1 when terminated by signal)
        code: i32,
        /// Trimmed stderr output
        stderr: String,
    },

    /// HTTP response status did not match the configured success status
    #[error("returned HTTP status: {0}")]
    UnexpectedStatus(u16),

    /// Jenkins build finished with a non-success result
    #[error("build failed")]
    BuildFailed,

    /// Jenkins build polling exceeded the configured iteration budget
    #[error("secure iterations limit exceed")]
    IterationsLimitExceeded,

    /// Jenkins API responded with an unusable payload
    #[error("jenkins API error: {0}")]
    Jenkins(String),

    /// Telegram Bot API rejected the message
    #[error("telegram API error: {0}")]
    Telegram(String),

    /// Transport-level HTTP failure
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Process spawn / IO failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
