//! Worker pool - concurrent task-group consumers
//!
//! `spawn_runners` starts N workers, each looping on the shared bounded
//! queue. A worker owns one group at a time and executes its tasks
//! sequentially through the exec gate, observing a metric after every
//! task regardless of outcome.

use std::sync::Arc;
use std::time::Instant;

use crossfire::MAsyncRx;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use reflex_blocker::{BlockCache, Blocker};
use reflex_executor::{group_details, task_details, TaskGroup};

use crate::exec::exec_task;

/// Injected clock for duration measurement.
pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

/// The wall clock.
pub fn system_clock() -> Clock {
    Arc::new(Instant::now)
}

/// Spawn `count` workers consuming task groups from `rx`.
///
/// Workers stop when the queue closes or `cancel` fires; in-flight groups
/// are finished either way, so shutdown drains cleanly.
pub fn spawn_runners<C>(
    count: usize,
    rx: MAsyncRx<TaskGroup>,
    blocker: Arc<Blocker<C>>,
    clock: Clock,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>>
where
    C: BlockCache + 'static,
{
    tracing::info!(runners = count, "starting runners");

    (0..count)
        .map(|worker_id| {
            let rx = rx.clone();
            let blocker = Arc::clone(&blocker);
            let clock = Arc::clone(&clock);
            let cancel = cancel.clone();

            tokio::spawn(async move {
                tracing::debug!(worker_id, "runner started");

                loop {
                    // Biased towards the queue so cancellation drains
                    // already-accepted groups instead of dropping them
                    let group = tokio::select! {
                        biased;
                        received = rx.recv() => match received {
                            Ok(group) => group,
                            Err(_) => break,
                        },
                        _ = cancel.cancelled() => break,
                    };

                    process_group(worker_id, &group, &blocker, &clock).await;
                }

                tracing::debug!(worker_id, "runner stopped");
            })
        })
        .collect()
}

/// Execute one group sequentially, aborting on the first failure.
async fn process_group<C: BlockCache>(
    worker_id: usize,
    group: &TaskGroup,
    blocker: &Blocker<C>,
    clock: &Clock,
) {
    tracing::debug!(worker_id, tasks = %group_details(group), "runner starts executing group");

    let total = group.len();
    for (index, task) in group.iter().enumerate() {
        let number = index + 1;
        let task = task.as_ref();

        let start = clock();
        let (result, error) = exec_task(task, blocker).await;
        let duration = clock().saturating_duration_since(start);

        let error_text = error.as_ref().map(ToString::to_string);
        reflex_metrics::executed_task_observe(
            task.rule(),
            task.alert(),
            task.executor_name(),
            result.as_str(),
            error_text.as_deref(),
            duration,
        );

        if let Some(error_text) = error_text {
            tracing::error!(
                worker_id,
                task = %task_details(task),
                result = %result,
                duration_ms = duration.as_millis() as u64,
                error = %error_text,
                "task #{number}/{total} failed, stopping group"
            );
            break;
        }

        if !result.is_successful() {
            tracing::debug!(
                worker_id,
                task = %task_details(task),
                result = %result,
                "task #{number}/{total} unsuccessful, stopping group"
            );
            break;
        }

        tracing::debug!(
            worker_id,
            task = %task_details(task),
            result = %result,
            duration_ms = duration.as_millis() as u64,
            "task #{number}/{total} finished"
        );
    }

    tracing::debug!(worker_id, "runner finished executing group");
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
