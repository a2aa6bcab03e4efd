//! Registration tokens and callback storage shared by every strategy.

use crate::kernel::Handle;
use std::sync::atomic::{AtomicU64, Ordering};

/// A nullary, non-throwing procedure run on a worker thread when a handle
/// fires. In practice this wakes a [`std::task::Waker`] (see [`crate::wait`]).
pub type Callback = Box<dyn Fn() + Send + 'static>;

/// Opaque receipt returned by `register_wait`, required by `unregister_wait`.
///
/// Bundles the handle it was issued against so lookup is O(1) without a
/// separate token -> handle side table; callers must still treat it as
/// opaque, since both fields are private.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    id: u64,
    pub(crate) handle: Handle,
}

impl Token {
    pub(crate) fn new(id: u64, handle: Handle) -> Self {
        Token { id, handle }
    }
}

/// A process-wide-unique-per-instance counter for minting [`Token`]s.
#[derive(Debug, Default)]
pub(crate) struct TokenMint(AtomicU64);

impl TokenMint {
    pub(crate) fn mint(&self, handle: Handle) -> Token {
        let id = self.0.fetch_add(1, Ordering::Relaxed);
        Token::new(id, handle)
    }
}
