//! Reflex - Runner
//!
//! The worker pool consuming task groups from the bounded queue.
//!
//! # Architecture
//!
//! ```text
//! [Webhook] --TaskGroup--> [bounded MPMC queue] --> [worker 1..N]
//!                                                       |
//!                                              exec gate + blocker
//!                                                       |
//!                                                    metrics
//! ```
//!
//! Within one group tasks run strictly in action order; the group is
//! aborted on the first task that errors or yields a result outside
//! {`success`, `success_without_block`}. `in_block` therefore terminates
//! the group too - a rule whose first action carries a block TTL gates
//! all later actions while the block lives. There is no ordering between
//! groups.

mod error;
mod exec;
mod runner;

pub use error::RunnerError;
pub use exec::{exec_task, ExecResult};
pub use runner::{spawn_runners, system_clock, Clock};

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
