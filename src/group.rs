//! WaitGroup (G): a set of user handles plus one cancel event, serviced by
//! one blocking worker thread.

use crate::kernel::{Handle, Kernel};
use crate::pool::GroupId;
use crate::pool::WaitPool;
use crate::runtime::Runtime;

/// One slot reserved for the group's cancel event under the platform's
/// 64-handle `WaitForMultipleObjects` ceiling.
pub const MAX_WAIT: usize = 63;

pub(crate) struct WaitGroup {
    #[allow(dead_code)] // kept for debug/trace context, not read directly
    pub(crate) id: GroupId,
    pub(crate) handles: Vec<Handle>,
    pub(crate) cancel_event: Handle,
    /// Set by a coordinator that has already called `set_event` on
    /// `cancel_event` and is waiting for the worker to observe and replace
    /// it. Lets a second mutation arriving before the worker wakes skip
    /// signaling again, so `cancel_event` is only ever swapped by the worker
    /// that actually observed it fire — see [`WaitPool::observe_group`].
    pub(crate) pending_wake: bool,
}

impl WaitGroup {
    pub(crate) fn new(id: GroupId, cancel_event: Handle) -> Self {
        WaitGroup { id, handles: Vec::new(), cancel_event, pending_wake: false }
    }
}

/// Outcome of a worker's post-wake check (step 3/4 of §4.2), reported by
/// [`WaitPool::observe_group`].
pub(crate) enum Wake {
    /// The cancel event had fired; it has already been replaced with a fresh
    /// one and the caller now owns `old_cancel_event` to close.
    Invalidated { old_cancel_event: Handle },
    /// The cancel event was not signaled: whatever `wait_multi` reported was
    /// a real handle.
    RealHandle,
}

/// The worker loop described in spec §4.2. Runs on a dedicated OS thread for
/// the lifetime of `group_id`; exits once the group's handle set empties.
pub(crate) fn run_worker<K: Kernel, R: Runtime>(pool: WaitPool<K, R>, kernel: K, group_id: GroupId) {
    loop {
        // Checked at the top of every iteration, not only after step 5:
        // a coordinator's `unregister_wait` can empty the group's handles
        // while we're still blocked, and there is no one else left to notice.
        if let Some(cancel_event) = pool.retire_if_empty(group_id) {
            kernel.close_handle(cancel_event);
            return;
        }

        // Step 1: snapshot under the pool lock, then release it.
        let snapshot = pool.snapshot_for_wait(group_id);

        // Step 2: blocking wait.
        let fired = match kernel.wait_multi(&snapshot) {
            Ok(index) => index,
            Err(err) => panic!("WaitForMultipleObjects failed for a wait group: {err}"),
        };

        // Steps 3/4: reacquire the pool lock and check the cancel event.
        match pool.observe_group(&kernel, group_id) {
            Wake::Invalidated { old_cancel_event } => {
                // Consume the signal and loop, discarding whatever `fired`
                // named even if it pointed at a real handle that also fired.
                kernel.close_handle(old_cancel_event);
                continue;
            }
            Wake::RealHandle => {
                // Step 5. `snapshot[0]` was the cancel event, so the
                // reported index maps one position earlier onto `handles`.
                let handle_index = fired
                    .checked_sub(1)
                    .expect("wait_multi reported the cancel event's index despite it not being signaled");
                let (handle, callbacks) = pool.execute_and_remove(group_id, handle_index);
                tracing::debug!(?group_id, ?handle, callbacks = callbacks.len(), "handle fired");
                for callback in callbacks {
                    callback();
                }
            }
        }
    }
}
