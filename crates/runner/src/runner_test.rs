use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use reflex_blocker::{Blocker, DEFAULT_CACHE_SIZE};
use reflex_executor::TaskGroup;

use super::*;
use crate::exec::tests::MockTask;

const TTL: Duration = Duration::from_secs(600);

async fn run_groups(groups: Vec<TaskGroup>, blocker: Arc<Blocker>) {
    let (tx, rx) = crossfire::mpmc::bounded_async::<TaskGroup>(16);
    let handles = spawn_runners(2, rx, blocker, system_clock(), CancellationToken::new());

    for group in groups {
        tx.send(group).await.unwrap();
    }
    drop(tx);

    // Workers exit once the queue is closed and drained
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn tasks_run_in_action_order() {
    let blocker = Arc::new(Blocker::with_cache_size(DEFAULT_CACHE_SIZE));

    let first = MockTask::new("fp1", Duration::ZERO, false);
    let second = MockTask::new("fp2", Duration::ZERO, false);
    let (first_calls, second_calls) = (first.exec_calls.clone(), second.exec_calls.clone());

    run_groups(vec![vec![Box::new(first), Box::new(second)]], blocker).await;

    assert_eq!(first_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn group_aborts_after_in_block() {
    let blocker = Arc::new(Blocker::with_cache_size(DEFAULT_CACHE_SIZE));

    // Pre-block the first task's fingerprint
    assert!(blocker.block_in_progress("mock", "fp1").unwrap());

    let gated = MockTask::new("fp1", TTL, false);
    let follower = MockTask::new("fp2", Duration::ZERO, false);
    let (gated_calls, follower_calls) = (gated.exec_calls.clone(), follower.exec_calls.clone());

    run_groups(vec![vec![Box::new(gated), Box::new(follower)]], blocker).await;

    assert_eq!(
        gated_calls.load(std::sync::atomic::Ordering::SeqCst),
        0,
        "blocked task must not execute"
    );
    assert_eq!(
        follower_calls.load(std::sync::atomic::Ordering::SeqCst),
        0,
        "in_block must stop the rest of the group"
    );
}

#[tokio::test]
async fn group_aborts_after_error() {
    let blocker = Arc::new(Blocker::with_cache_size(DEFAULT_CACHE_SIZE));

    let failing = MockTask::new("fp1", Duration::ZERO, true);
    let follower = MockTask::new("fp2", Duration::ZERO, false);
    let (failing_calls, follower_calls) = (failing.exec_calls.clone(), follower.exec_calls.clone());

    run_groups(vec![vec![Box::new(failing), Box::new(follower)]], blocker).await;

    assert_eq!(failing_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(
        follower_calls.load(std::sync::atomic::Ordering::SeqCst),
        0,
        "errors must stop the rest of the group"
    );
}

#[tokio::test]
async fn independent_groups_both_run() {
    let blocker = Arc::new(Blocker::with_cache_size(DEFAULT_CACHE_SIZE));

    let failing = MockTask::new("fp1", Duration::ZERO, true);
    let unrelated = MockTask::new("fp2", Duration::ZERO, false);
    let (failing_calls, unrelated_calls) =
        (failing.exec_calls.clone(), unrelated.exec_calls.clone());

    run_groups(
        vec![vec![Box::new(failing)], vec![Box::new(unrelated)]],
        blocker,
    )
    .await;

    assert_eq!(failing_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(
        unrelated_calls.load(std::sync::atomic::Ordering::SeqCst),
        1,
        "failures are scoped to their own group"
    );
}

#[tokio::test]
async fn cancellation_stops_idle_runners() {
    let blocker = Arc::new(Blocker::with_cache_size(DEFAULT_CACHE_SIZE));
    let (_tx, rx) = crossfire::mpmc::bounded_async::<TaskGroup>(16);

    let cancel = CancellationToken::new();
    let handles = spawn_runners(2, rx, blocker, system_clock(), cancel.clone());

    cancel.cancel();
    for handle in handles {
        handle.await.unwrap();
    }
}
