//! The `Pair` strategy (§9): one dedicated worker thread per registered
//! wait, rather than packing handles into shared groups. A degenerate case
//! of the same front-end contract as [`crate::pool::WaitPool`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::OsError;
use crate::kernel::{Handle, Kernel};
use crate::registry::WaitRegistry;
use crate::runtime::Runtime;
use crate::token::{Callback, Token, TokenMint};

struct Inner {
    cancel_events: HashMap<Token, Handle>,
    tokens: TokenMint,
}

/// A `WaitRegistry` backed by one thread per wait instead of per group.
pub struct PairRegistry<K: Kernel, R: Runtime> {
    inner: Arc<Mutex<Inner>>,
    kernel: K,
    runtime: R,
}

impl<K: Kernel, R: Runtime> Clone for PairRegistry<K, R> {
    fn clone(&self) -> Self {
        PairRegistry {
            inner: Arc::clone(&self.inner),
            kernel: self.kernel.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<K: Kernel, R: Runtime> PairRegistry<K, R> {
    pub fn new(kernel: K, runtime: R) -> Self {
        PairRegistry {
            inner: Arc::new(Mutex::new(Inner {
                cancel_events: HashMap::new(),
                tokens: TokenMint::default(),
            })),
            kernel,
            runtime,
        }
    }

    pub fn is_signaled(&self, handle: Handle) -> Result<bool, OsError> {
        self.kernel.is_signaled(handle)
    }

    pub fn register_wait(&self, handle: Handle, callback: Callback) -> Token {
        let cancel_event = self.kernel.create_event().expect("failed to allocate cancel event");
        let token = {
            let mut inner = self.inner.lock();
            let token = inner.tokens.mint(handle);
            inner.cancel_events.insert(token, cancel_event);
            token
        };

        let kernel = self.kernel.clone();
        let registry = self.clone();
        self.runtime.spawn_background_thread(
            move || {
                let fired = match kernel.wait_multi(&[cancel_event, handle]) {
                    Ok(index) => index,
                    Err(err) => panic!("WaitForMultipleObjects failed for a paired wait: {err}"),
                };
                if fired != 0 {
                    callback();
                }
                // Remove the entry before closing the handle: a racing
                // `unregister_wait` only ever sees "still present, handle
                // still valid" or "already gone", never a removed-looking
                // entry whose handle has already been closed (and possibly
                // recycled by an unrelated `CreateEventW`).
                registry.inner.lock().cancel_events.remove(&token);
                kernel.close_handle(cancel_event);
            },
            |outcome| {
                if let Err(panic) = outcome {
                    tracing::error!(?panic, "paired wait worker thread panicked");
                }
            },
        );

        token
    }

    pub fn unregister_wait(&self, token: Token) -> bool {
        let mut inner = self.inner.lock();
        match inner.cancel_events.remove(&token) {
            Some(cancel_event) => {
                drop(inner);
                self.kernel.set_event(cancel_event);
                true
            }
            None => false,
        }
    }
}

impl<K: Kernel, R: Runtime> WaitRegistry for PairRegistry<K, R> {
    fn is_signaled(&self, handle: Handle) -> Result<bool, OsError> {
        PairRegistry::is_signaled(self, handle)
    }

    fn register_wait(&self, handle: Handle, callback: Callback) -> Token {
        PairRegistry::register_wait(self, handle, callback)
    }

    fn unregister_wait(&self, token: Token) -> bool {
        PairRegistry::unregister_wait(self, token)
    }
}
