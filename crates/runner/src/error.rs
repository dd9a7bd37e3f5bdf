//! Runner error types

use thiserror::Error;

use reflex_blocker::CacheError;
use reflex_executor::ExecutorError;

/// Failure of a single task passage through the exec gate.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Blocker cache failure
    #[error(transparent)]
    Block(#[from] CacheError),

    /// Task execution failure, surfaced verbatim from the executor
    #[error(transparent)]
    Exec(#[from] ExecutorError),
}
