use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::pool::{PoolOptions, WaitPool};
use crate::testing::{FakeKernel, FakeRuntime};

fn small_pool() -> (WaitPool<FakeKernel, FakeRuntime>, FakeKernel, FakeRuntime) {
    let kernel = FakeKernel::new();
    let runtime = FakeRuntime::new();
    let pool = WaitPool::with_options(kernel.clone(), runtime.clone(), PoolOptions { max_wait: 2 });
    (pool, kernel, runtime)
}

#[test]
fn register_wait_coalesces_duplicate_handles_into_one_group_slot() {
    let (pool, kernel, _runtime) = small_pool();
    let h = kernel.new_handle();
    let fired = Arc::new(AtomicUsize::new(0));

    let cb = {
        let fired = Arc::clone(&fired);
        Box::new(move || {
            fired.fetch_add(1, Ordering::SeqCst);
        })
    };
    let token_a = pool.register_wait(h, cb);
    let cb2 = {
        let fired = Arc::clone(&fired);
        Box::new(move || {
            fired.fetch_add(1, Ordering::SeqCst);
        })
    };
    let token_b = pool.register_wait(h, cb2);

    // Both callbacks were registered for the same handle: exactly one group,
    // one live handle slot.
    assert_eq!(pool.group_count(), 1);
    assert_eq!(pool.group_sizes(), vec![1]);
    assert_ne!(token_a, token_b);
}

#[test]
fn signal_delivers_to_all_callbacks_for_a_shared_handle_then_removes_it() {
    let (pool, kernel, runtime) = small_pool();
    let h = kernel.new_handle();
    let fired = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let fired = Arc::clone(&fired);
        pool.register_wait(h, Box::new(move || {
            fired.fetch_add(1, Ordering::SeqCst);
        }));
    }

    kernel.signal(h);
    // The group worker must observe the signal, run both callbacks, and
    // (since the handle was the group's only member) tear the group down.
    wait_until(|| fired.load(Ordering::SeqCst) == 2, Duration::from_secs(2));
    runtime.join_all();

    assert_eq!(fired.load(Ordering::SeqCst), 2);
    assert!(!pool.contains_handle(h));
    assert_eq!(pool.group_count(), 0);
}

#[test]
fn unregister_wait_is_safe_to_call_twice() {
    let (pool, kernel, _runtime) = small_pool();
    let h = kernel.new_handle();
    let token = pool.register_wait(h, Box::new(|| {}));

    assert!(pool.unregister_wait(token));
    assert!(!pool.unregister_wait(token));
}

#[test]
fn unregistering_one_of_two_callbacks_leaves_the_handle_registered() {
    let (pool, kernel, _runtime) = small_pool();
    let h = kernel.new_handle();
    let token_a = pool.register_wait(h, Box::new(|| {}));
    let _token_b = pool.register_wait(h, Box::new(|| {}));

    assert!(pool.unregister_wait(token_a));
    assert!(pool.contains_handle(h));
}

#[test]
fn max_wait_plus_one_handles_split_into_two_groups() {
    // max_wait = 2 makes this cheap to exercise without real handle limits.
    let (pool, kernel, _runtime) = small_pool();
    for _ in 0..3 {
        let h = kernel.new_handle();
        pool.register_wait(h, Box::new(|| {}));
    }
    assert_eq!(pool.group_count(), 2);
    let mut sizes = pool.group_sizes();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 2]);
}

#[test]
fn two_times_max_wait_plus_one_handles_split_into_three_groups() {
    let (pool, kernel, _runtime) = small_pool();
    for _ in 0..5 {
        let h = kernel.new_handle();
        pool.register_wait(h, Box::new(|| {}));
    }
    assert_eq!(pool.group_count(), 3);
}

#[test]
fn pool_never_closes_a_user_handle() {
    let (pool, kernel, runtime) = small_pool();
    let h = kernel.new_handle();
    pool.register_wait(h, Box::new(|| {}));
    kernel.signal(h);
    wait_until(|| !pool.contains_handle(h), Duration::from_secs(2));
    runtime.join_all();

    assert!(!kernel.closed_handles().contains(&h));
}

fn wait_until(mut predicate: impl FnMut() -> bool, timeout: Duration) {
    let deadline = std::time::Instant::now() + timeout;
    while !predicate() {
        if std::time::Instant::now() > deadline {
            panic!("condition did not become true within {timeout:?}");
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
