//! WinAPI binding (W): a thin, stateless wrapper over the handful of kernel
//! calls the pool needs. Held behind a trait so tests can swap in an
//! in-memory fake (see [`crate::testing`]) instead of real Windows handles.

mod win32;
pub use win32::Win32Kernel;

use crate::error::OsError;

/// An OS-owned kernel object reference. Never closed by this crate except
/// for handles it created itself (cancel events).
pub type Handle = windows_sys::Win32::Foundation::HANDLE;

/// The four Windows operations the pool needs, plus a non-blocking probe.
///
/// Implementors perform no locking and hold no state; all coordination lives
/// in [`crate::pool::WaitPool`].
pub trait Kernel: Clone + Send + Sync + 'static {
    /// Allocate a fresh manual-reset, initially-unsignaled event.
    fn create_event(&self) -> Result<Handle, OsError>;

    /// Signal `handle`. Infallible in practice; OS failures here indicate a
    /// handle that was already closed, which is a bug in this crate.
    fn set_event(&self, handle: Handle);

    /// Release `handle`. Infallible in practice, for the same reason.
    fn close_handle(&self, handle: Handle);

    /// Block until some handle in `handles` (length <= 64) is signaled.
    /// Returns the index that fired. Abandoned-mutex return codes are
    /// translated to the underlying index and logged as a warning rather
    /// than surfaced as a distinct error.
    fn wait_multi(&self, handles: &[Handle]) -> Result<usize, OsError>;

    /// Zero-timeout probe: true iff `handle` is currently signaled.
    fn is_signaled(&self, handle: Handle) -> Result<bool, OsError>;
}
