//! Error types surfaced by the kernel binding and the pool.

use std::io;

/// A Windows API call failed, or a handle was discovered to be invalid.
///
/// Raised by the zero-timeout signaled probe and by the blocking multi-wait;
/// never raised for an abandoned mutex, which is demoted to a warning and
/// treated as an ordinary signal (see [`crate::kernel::Kernel::wait_multi`]).
#[derive(Debug, thiserror::Error)]
#[error("windows wait operation failed: {0}")]
pub struct OsError(#[source] io::Error);

impl OsError {
    pub(crate) fn last_os_error() -> Self {
        OsError(io::Error::last_os_error())
    }

    pub(crate) fn from_raw(err: io::Error) -> Self {
        OsError(err)
    }
}
