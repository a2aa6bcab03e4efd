//! An async multiplexer for waiting on Windows kernel handles.
//!
//! The platform's blocking primitive, `WaitForMultipleObjects`, accepts at
//! most 64 handles per call and occupies a whole OS thread while blocked.
//! This crate aggregates many concurrent `wait_for_single_object` futures
//! into groups of up to 63 handles apiece, each serviced by one worker
//! thread, and wakes the right [`std::task::Waker`] when a handle fires.
//!
//! ```no_run
//! use winwait::{kernel::Win32Kernel, runtime::StdThreadRuntime, wait_for_single_object, WaitPool};
//!
//! # async fn example(some_event_handle: winwait::kernel::Handle) -> Result<(), winwait::OsError> {
//! let pool = WaitPool::new(Win32Kernel, StdThreadRuntime);
//! wait_for_single_object(&pool, some_event_handle).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod group;
pub mod kernel;
pub mod pair;
pub mod pool;
pub mod registry;
pub mod runtime;
pub mod token;
pub mod wait;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(test)]
mod tests;

pub use error::OsError;
pub use pool::{PoolOptions, WaitPool};
pub use registry::{Strategy, WaitMultiplexer, WaitRegistry};
pub use token::Token;
pub use wait::{wait_for_single_object, WaitForSingleObject};
