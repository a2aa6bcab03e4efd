use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::pair::PairRegistry;
use crate::testing::{FakeKernel, FakeRuntime};

#[test]
fn signaling_the_handle_runs_the_callback() {
    let kernel = FakeKernel::new();
    let runtime = FakeRuntime::new();
    let registry = PairRegistry::new(kernel.clone(), runtime.clone());

    let h = kernel.new_handle();
    let fired = Arc::new(AtomicUsize::new(0));
    {
        let fired = Arc::clone(&fired);
        registry.register_wait(h, Box::new(move || {
            fired.fetch_add(1, Ordering::SeqCst);
        }));
    }

    kernel.signal(h);
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while fired.load(Ordering::SeqCst) == 0 {
        if std::time::Instant::now() > deadline {
            panic!("callback never ran");
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    runtime.join_all();
}

#[test]
fn unregistering_before_signal_prevents_the_callback() {
    let kernel = FakeKernel::new();
    let runtime = FakeRuntime::new();
    let registry = PairRegistry::new(kernel.clone(), runtime.clone());

    let h = kernel.new_handle();
    let fired = Arc::new(AtomicUsize::new(0));
    let token = {
        let fired = Arc::clone(&fired);
        registry.register_wait(h, Box::new(move || {
            fired.fetch_add(1, Ordering::SeqCst);
        }))
    };

    assert!(registry.unregister_wait(token));
    assert!(!registry.unregister_wait(token), "double unregister must be safe and return false");

    runtime.join_all();
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
