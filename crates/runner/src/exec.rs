//! Exec gate - the dedup contract around a single task
//!
//! Wraps `task.exec()` with the blocker's two-phase protocol. Tasks
//! without a block TTL bypass the blocker entirely; everything else must
//! win the in-progress block first, and converts it into a finite-TTL
//! block on success or releases it on failure.

use std::fmt;

use reflex_blocker::{BlockCache, Blocker};
use reflex_executor::Task;

use crate::error::RunnerError;

/// Outcome of one task passage through the exec gate.
///
/// The string forms feed the `result` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecResult {
    /// Blocker cache failed before execution
    BlockError,
    /// Fingerprint already blocked; task skipped
    InBlock,
    /// Executed, but the finite-TTL block could not be installed
    CanNotBlock,
    /// Execution failed; in-progress block released
    ExecError,
    /// Execution failed for an unblockable task
    ExecErrorWithoutBlock,
    /// Executed and blocked for the task TTL
    Success,
    /// Executed; task carries no block TTL
    SuccessWithoutBlock,
}

impl ExecResult {
    /// Metric label value.
    pub fn as_str(self) -> &'static str {
        match self {
            ExecResult::BlockError => "block_error",
            ExecResult::InBlock => "in_block",
            ExecResult::CanNotBlock => "can_not_block",
            ExecResult::ExecError => "exec_error",
            ExecResult::ExecErrorWithoutBlock => "exec_error_without_block",
            ExecResult::Success => "success",
            ExecResult::SuccessWithoutBlock => "success_without_block",
        }
    }

    /// Whether the group may continue past this result.
    pub fn is_successful(self) -> bool {
        matches!(self, ExecResult::Success | ExecResult::SuccessWithoutBlock)
    }
}

impl fmt::Display for ExecResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run one task through the dedup gate.
///
/// The in-progress block is installed with an infinite TTL *before*
/// execution and replaced with the task TTL on success (or released on
/// failure); two workers can never both observe the fingerprint as free.
pub async fn exec_task<C: BlockCache>(
    task: &dyn Task,
    blocker: &Blocker<C>,
) -> (ExecResult, Option<RunnerError>) {
    if task.block_ttl().is_zero() {
        return match task.exec().await {
            Ok(()) => (ExecResult::SuccessWithoutBlock, None),
            Err(err) => (ExecResult::ExecErrorWithoutBlock, Some(err.into())),
        };
    }

    let executor = task.executor_name();
    let fingerprint = task.fingerprint();

    let acquired = match blocker.block_in_progress(executor, &fingerprint) {
        Ok(acquired) => acquired,
        Err(err) => return (ExecResult::BlockError, Some(err.into())),
    };
    if !acquired {
        return (ExecResult::InBlock, None);
    }

    if let Err(err) = task.exec().await {
        blocker.unblock(executor, &fingerprint);
        return (ExecResult::ExecError, Some(err.into()));
    }

    if let Err(err) = blocker.block_for_ttl(executor, &fingerprint, task.block_ttl()) {
        return (ExecResult::CanNotBlock, Some(err.into()));
    }

    (ExecResult::Success, None)
}

#[cfg(test)]
#[path = "exec_test.rs"]
pub(crate) mod tests;
