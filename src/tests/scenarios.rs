//! End-to-end scenarios (§8) driven by a real Tokio executor, so
//! cancellation-via-drop and task scheduling are exercised for real rather
//! than via manual polling.

use std::time::Duration;

use crate::pool::{PoolOptions, WaitPool};
use crate::testing::{FakeKernel, FakeRuntime};
use crate::wait::wait_for_single_object;

fn pool() -> (WaitPool<FakeKernel, FakeRuntime>, FakeKernel, FakeRuntime) {
    let kernel = FakeKernel::new();
    let runtime = FakeRuntime::new();
    (WaitPool::new(kernel.clone(), runtime.clone()), kernel, runtime)
}

/// S1: basic signal.
#[tokio::test]
async fn basic_signal_resumes_the_waiting_task() {
    let (pool, kernel, runtime) = pool();
    let h = kernel.new_handle();

    let waiter_pool = pool.clone();
    let waiter = tokio::spawn(async move { wait_for_single_object(&waiter_pool, h).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    kernel.signal(h);

    let result = waiter.await.expect("waiter task must not panic");
    assert!(result.is_ok());

    tokio::time::timeout(Duration::from_secs(2), async {
        while pool.group_count() != 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("group must drain after delivering the signal");
    runtime.join_all();
}

/// S2: cancel before signal.
#[tokio::test]
async fn cancelling_before_signal_leaves_no_trace_in_the_pool() {
    let (pool, kernel, _runtime) = pool();
    let h = kernel.new_handle();

    let result = tokio::time::timeout(Duration::from_millis(20), wait_for_single_object(&pool, h)).await;
    assert!(result.is_err(), "the handle never signals, so the timeout must elapse");
    assert!(!pool.contains_handle(h));
    assert_eq!(pool.group_count(), 0);
}

/// S3: two callbacks, one handle — exercised through two independent awaiters.
#[tokio::test]
async fn two_waiters_on_one_handle_both_resume() {
    let (pool, kernel, runtime) = pool();
    let h = kernel.new_handle();

    let pool_a = pool.clone();
    let pool_b = pool.clone();
    let a = tokio::spawn(async move { wait_for_single_object(&pool_a, h).await });
    let b = tokio::spawn(async move { wait_for_single_object(&pool_b, h).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    kernel.signal(h);

    assert!(a.await.unwrap().is_ok());
    assert!(b.await.unwrap().is_ok());
    runtime.join_all();
}

/// S4: splitting across groups (using a small `max_wait` rather than
/// registering 64 real handles, which is equivalent under §4.3's policy).
#[tokio::test]
async fn handles_beyond_one_groups_capacity_spill_into_a_second_group() {
    let kernel = FakeKernel::new();
    let runtime = FakeRuntime::new();
    let pool = WaitPool::with_options(kernel.clone(), runtime.clone(), PoolOptions { max_wait: 3 });

    let handles: Vec<_> = (0..4).map(|_| kernel.new_handle()).collect();
    let mut waiters = Vec::new();
    for h in &handles {
        let pool = pool.clone();
        let h = *h;
        waiters.push(tokio::spawn(async move { wait_for_single_object(&pool, h).await }));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.group_count(), 2);

    let last = *handles.last().unwrap();
    kernel.signal(last);
    let last_waiter = waiters.pop().unwrap();
    assert!(last_waiter.await.unwrap().is_ok());

    // The other three handles are still unsignaled; their waiters — and the
    // worker threads blocked on their behalf — are intentionally abandoned
    // here rather than joined, since this test only asserts the packing
    // policy and the delivery of one targeted signal.
    for waiter in waiters {
        waiter.abort();
    }
}
