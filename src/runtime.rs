//! The runtime collaboration interface (§6, consumed): "run this on a
//! background OS thread and deliver the outcome." This is the only
//! capability the pool needs from its surrounding async runtime; everything
//! else in the distilled design's runtime surface
//! (`current_task_handle`/`suspend_with_abort`/`checkpoint*`) is subsumed by
//! `std::future::Future::poll` and `std::task::Waker` (see [`crate::wait`]).

use std::panic;
use std::thread;

/// The outcome of a background thread: `Ok(())` on normal return, or the
/// panic payload if it unwound.
pub type ThreadOutcome = thread::Result<()>;

/// Spawns the blocking worker threads this crate needs (one per live
/// `WaitGroup`, or one per wait under the `Pair` strategy).
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Run `f` on a fresh OS thread; deliver its outcome to `on_done`.
    /// `on_done` is called even if `f` panics, with the panic payload.
    fn spawn_background_thread(
        &self,
        f: impl FnOnce() + Send + 'static,
        on_done: impl FnOnce(ThreadOutcome) + Send + 'static,
    );
}

/// The minimal, always-available adapter: bare `std::thread::spawn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdThreadRuntime;

impl Runtime for StdThreadRuntime {
    fn spawn_background_thread(
        &self,
        f: impl FnOnce() + Send + 'static,
        on_done: impl FnOnce(ThreadOutcome) + Send + 'static,
    ) {
        thread::spawn(move || {
            let outcome = panic::catch_unwind(panic::AssertUnwindSafe(f));
            on_done(outcome);
        });
    }
}

/// Delegates the blocking worker thread to Tokio's blocking thread pool via
/// [`tokio::task::spawn_blocking`], so its lifetime is accounted for by the
/// runtime the caller is already using.
#[cfg(feature = "tokio-runtime")]
#[derive(Debug, Clone)]
pub struct TokioRuntime {
    handle: tokio::runtime::Handle,
}

#[cfg(feature = "tokio-runtime")]
impl TokioRuntime {
    /// Captures the handle of the currently-running Tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime context, same as
    /// [`tokio::runtime::Handle::current`].
    pub fn current() -> Self {
        TokioRuntime { handle: tokio::runtime::Handle::current() }
    }

    pub fn from_handle(handle: tokio::runtime::Handle) -> Self {
        TokioRuntime { handle }
    }
}

#[cfg(feature = "tokio-runtime")]
impl Runtime for TokioRuntime {
    fn spawn_background_thread(
        &self,
        f: impl FnOnce() + Send + 'static,
        on_done: impl FnOnce(ThreadOutcome) + Send + 'static,
    ) {
        self.handle.spawn_blocking(move || {
            let outcome = panic::catch_unwind(panic::AssertUnwindSafe(f));
            on_done(outcome);
        });
    }
}
