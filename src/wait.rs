//! Async front end (A): `wait_for_single_object`, the one public future.
//!
//! Modeled directly on the teacher crate's own `WaitFuture` (`wait/mod.rs`):
//! shared `Mutex<Shared>` state between the future and the callback that
//! resolves it, with the same `Waker::will_wake` dance to avoid redundant
//! clones across polls.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::error::OsError;
use crate::kernel::Handle;
use crate::registry::WaitRegistry;
use crate::token::Token;

#[derive(Default)]
struct Shared {
    waker: Option<Waker>,
    result: Option<Result<(), OsError>>,
}

enum State {
    Start,
    Registered { shared: Arc<Mutex<Shared>>, token: Token },
    Done,
}

/// Resolves when `handle` becomes signaled. Dropping this future before it
/// resolves cancels the wait: the registration is removed and no callback
/// runs afterward (§4.4).
pub struct WaitForSingleObject<Reg: WaitRegistry> {
    registry: Reg,
    handle: Handle,
    state: State,
}

/// Asynchronously wait for `handle` to become signaled.
///
/// Resolves immediately, with no registration and no worker thread, if the
/// handle is already signaled at the first poll (§8, property 9).
pub fn wait_for_single_object<Reg: WaitRegistry>(registry: &Reg, handle: Handle) -> WaitForSingleObject<Reg> {
    WaitForSingleObject { registry: registry.clone(), handle, state: State::Start }
}

impl<Reg: WaitRegistry> Future for WaitForSingleObject<Reg> {
    type Output = Result<(), OsError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            match &self.state {
                State::Start => match self.registry.is_signaled(self.handle) {
                    Ok(true) => {
                        self.state = State::Done;
                        return Poll::Ready(Ok(()));
                    }
                    Err(err) => {
                        self.state = State::Done;
                        return Poll::Ready(Err(err));
                    }
                    Ok(false) => {
                        let shared = Arc::new(Mutex::new(Shared {
                            waker: Some(cx.waker().clone()),
                            result: None,
                        }));
                        let wakeup_shared = Arc::clone(&shared);
                        let token = self.registry.register_wait(
                            self.handle,
                            Box::new(move || {
                                let mut shared = wakeup_shared.lock();
                                shared.result = Some(Ok(()));
                                if let Some(waker) = shared.waker.take() {
                                    waker.wake();
                                }
                            }),
                        );
                        self.state = State::Registered { shared, token };
                        return Poll::Pending;
                    }
                },
                State::Registered { shared, .. } => {
                    let mut locked = shared.lock();
                    match locked.result.take() {
                        Some(result) => {
                            drop(locked);
                            self.state = State::Done;
                            return Poll::Ready(result);
                        }
                        None => {
                            let new_waker = cx.waker();
                            locked.waker = match locked.waker.take() {
                                None => Some(new_waker.clone()),
                                Some(old_waker) => match old_waker.will_wake(new_waker) {
                                    true => Some(old_waker),
                                    false => Some(new_waker.clone()),
                                },
                            };
                            return Poll::Pending;
                        }
                    }
                }
                State::Done => panic!("WaitForSingleObject polled after completion"),
            }
        }
    }
}

impl<Reg: WaitRegistry> Drop for WaitForSingleObject<Reg> {
    fn drop(&mut self) {
        if let State::Registered { token, .. } = &self.state {
            self.registry.unregister_wait(*token);
        }
    }
}
