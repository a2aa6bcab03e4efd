//! In-memory [`Kernel`] and [`Runtime`] test doubles.
//!
//! Exposed (behind `cfg(any(test, feature = "testing"))`, see `lib.rs`) so
//! both this crate's own unit tests and downstream integration tests can
//! drive the full pool/group machinery without any real Windows handles —
//! useful since the real FFI surface cannot be exercised outside Windows.

use std::collections::HashMap;
use std::io;
use std::panic;
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};

use crate::error::OsError;
use crate::kernel::{Handle, Kernel};
use crate::runtime::{Runtime, ThreadOutcome};

struct FakeKernelState {
    next_id: Handle,
    signaled: HashMap<Handle, bool>,
    closed: Vec<Handle>,
    fail_next_wait: bool,
}

struct FakeKernelShared {
    state: Mutex<FakeKernelState>,
    condvar: Condvar,
}

/// An in-memory stand-in for [`Win32Kernel`](crate::kernel::Win32Kernel).
/// Handles are small synthetic integers; "signaling" is a boolean flip
/// broadcast to anyone blocked in [`Kernel::wait_multi`].
#[derive(Clone)]
pub struct FakeKernel(Arc<FakeKernelShared>);

impl Default for FakeKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeKernel {
    pub fn new() -> Self {
        FakeKernel(Arc::new(FakeKernelShared {
            state: Mutex::new(FakeKernelState {
                next_id: 0,
                signaled: HashMap::new(),
                closed: Vec::new(),
                fail_next_wait: false,
            }),
            condvar: Condvar::new(),
        }))
    }

    /// Allocate a handle simulating a user-owned kernel object (e.g. an
    /// event a test holds directly), initially unsignaled.
    pub fn new_handle(&self) -> Handle {
        let mut state = self.0.state.lock();
        state.next_id += 1;
        let handle = state.next_id;
        state.signaled.insert(handle, false);
        handle
    }

    /// Signal `handle`, waking anyone blocked on it in `wait_multi`.
    pub fn signal(&self, handle: Handle) {
        let mut state = self.0.state.lock();
        state.signaled.insert(handle, true);
        self.0.condvar.notify_all();
    }

    /// Handles this kernel has closed, in the order it closed them. Tests
    /// use this to verify the pool never closes a handle it did not itself
    /// create as a cancel event (§8, invariant 3).
    pub fn closed_handles(&self) -> Vec<Handle> {
        self.0.state.lock().closed.clone()
    }

    /// Make the next call to `wait_multi` return a simulated `WAIT_FAILED`.
    pub fn fail_next_wait(&self) {
        self.0.state.lock().fail_next_wait = true;
    }
}

impl Kernel for FakeKernel {
    fn create_event(&self) -> Result<Handle, OsError> {
        Ok(self.new_handle())
    }

    fn set_event(&self, handle: Handle) {
        self.signal(handle);
    }

    fn close_handle(&self, handle: Handle) {
        let mut state = self.0.state.lock();
        state.signaled.remove(&handle);
        state.closed.push(handle);
    }

    fn wait_multi(&self, handles: &[Handle]) -> Result<usize, OsError> {
        let mut state = self.0.state.lock();
        loop {
            if state.fail_next_wait {
                state.fail_next_wait = false;
                return Err(OsError::from_raw(io::Error::other("simulated WAIT_FAILED")));
            }
            if let Some(index) = handles.iter().position(|h| *state.signaled.get(h).unwrap_or(&false)) {
                return Ok(index);
            }
            self.0.condvar.wait(&mut state);
        }
    }

    fn is_signaled(&self, handle: Handle) -> Result<bool, OsError> {
        Ok(*self.0.state.lock().signaled.get(&handle).unwrap_or(&false))
    }
}

/// A [`Runtime`] backed by real OS threads (worker threads genuinely block,
/// fake or not) but which remembers every [`thread::JoinHandle`] so tests
/// can deterministically drain them with [`FakeRuntime::join_all`] before
/// asserting on pool state.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    handles: Arc<Mutex<Vec<thread::JoinHandle<ThreadOutcome>>>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join every thread spawned so far, in spawn order, and re-panic with
    /// the original payload if any of its `f` panicked — independent of
    /// whatever the test's `on_done` callback chose to do with the outcome.
    pub fn join_all(&self) {
        let mut handles = self.handles.lock();
        for handle in handles.drain(..) {
            let outcome = handle.join().expect("runtime worker thread itself panicked");
            if let Err(payload) = outcome {
                panic::resume_unwind(payload);
            }
        }
    }
}

impl Runtime for FakeRuntime {
    fn spawn_background_thread(
        &self,
        f: impl FnOnce() + Send + 'static,
        on_done: impl FnOnce(ThreadOutcome) + Send + 'static,
    ) {
        let joined = thread::spawn(move || {
            let outcome = panic::catch_unwind(panic::AssertUnwindSafe(f));
            let repeated = match &outcome {
                Ok(()) => Ok(()),
                Err(payload) => Err(stringify_panic(payload)),
            };
            on_done(outcome);
            repeated.map_err(|message| -> Box<dyn std::any::Any + Send> { Box::new(message) })
        });
        self.handles.lock().push(joined);
    }
}

fn stringify_panic(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
