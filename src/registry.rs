//! The `Strategy` facade (§9): a single trait both the batched `Pool`
//! strategy ([`crate::pool::WaitPool`]) and the degenerate `Pair` strategy
//! ([`crate::pair::PairRegistry`]) implement, so [`crate::wait`] can be
//! written once against either.

use crate::error::OsError;
use crate::kernel::{Handle, Kernel};
use crate::pair::PairRegistry;
use crate::pool::WaitPool;
use crate::runtime::Runtime;
use crate::token::{Callback, Token};

/// Which implementation backs a [`WaitMultiplexer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Batched groups of up to 63 handles per worker thread (§3–§4). The
    /// default; minimizes live worker threads.
    Pool,
    /// One dedicated worker thread per registered wait. Trades worker
    /// threads for simplicity; useful as a baseline in tests and as a
    /// fallback where group packing isn't wanted.
    Pair,
}

/// The capability both strategies provide: probe, register, unregister.
/// [`crate::wait::wait_for_single_object`] is written against this trait
/// alone, so it works unchanged over either strategy.
pub trait WaitRegistry: Clone + Send + Sync + 'static {
    fn is_signaled(&self, handle: Handle) -> Result<bool, OsError>;
    fn register_wait(&self, handle: Handle, callback: Callback) -> Token;
    fn unregister_wait(&self, token: Token) -> bool;
}

/// A `WaitRegistry` that dispatches to whichever [`Strategy`] it was built
/// with, chosen once at construction time rather than by monkey-patching
/// module globals at import time (§9).
pub enum WaitMultiplexer<K: Kernel, R: Runtime> {
    Pool(WaitPool<K, R>),
    Pair(PairRegistry<K, R>),
}

impl<K: Kernel, R: Runtime> Clone for WaitMultiplexer<K, R> {
    fn clone(&self) -> Self {
        match self {
            Self::Pool(p) => Self::Pool(p.clone()),
            Self::Pair(p) => Self::Pair(p.clone()),
        }
    }
}

impl<K: Kernel, R: Runtime> WaitMultiplexer<K, R> {
    pub fn new(strategy: Strategy, kernel: K, runtime: R) -> Self {
        match strategy {
            Strategy::Pool => Self::Pool(WaitPool::new(kernel, runtime)),
            Strategy::Pair => Self::Pair(PairRegistry::new(kernel, runtime)),
        }
    }
}

impl<K: Kernel, R: Runtime> WaitRegistry for WaitMultiplexer<K, R> {
    fn is_signaled(&self, handle: Handle) -> Result<bool, OsError> {
        match self {
            Self::Pool(p) => p.is_signaled(handle),
            Self::Pair(p) => p.is_signaled(handle),
        }
    }

    fn register_wait(&self, handle: Handle, callback: Callback) -> Token {
        match self {
            Self::Pool(p) => p.register_wait(handle, callback),
            Self::Pair(p) => p.register_wait(handle, callback),
        }
    }

    fn unregister_wait(&self, token: Token) -> bool {
        match self {
            Self::Pool(p) => p.unregister_wait(token),
            Self::Pair(p) => p.unregister_wait(token),
        }
    }
}
