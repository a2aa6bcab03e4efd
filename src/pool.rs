//! WaitPool (P): the process-wide registry mapping handles to callbacks and
//! to the [`WaitGroup`] that currently owns them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::OsError;
use crate::group::{self, WaitGroup, MAX_WAIT};
use crate::kernel::{Handle, Kernel};
use crate::registry::WaitRegistry;
use crate::runtime::Runtime;
use crate::token::{Callback, Token, TokenMint};

/// Identifies a live [`WaitGroup`] within a pool. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct GroupId(u64);

/// Tuning knobs for a [`WaitPool`]. Mirrors the ambient `Options`-struct
/// convention used elsewhere in this crate family for anything that would
/// otherwise be a bare constant.
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    /// Maximum user handles per group, one slot short of the platform's
    /// 64-handle `WaitForMultipleObjects` ceiling (the cancel event takes
    /// the reserved slot). Exposed mainly so tests can exercise the
    /// group-splitting boundary without registering 63 real handles.
    pub max_wait: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        PoolOptions { max_wait: MAX_WAIT }
    }
}

pub(crate) struct PoolInner {
    groups: HashMap<GroupId, WaitGroup>,
    jobs_by_handle: HashMap<Handle, Vec<(Token, Callback)>>,
    group_of: HashMap<Handle, GroupId>,
    non_full_groups: BTreeMap<usize, BTreeSet<GroupId>>,
    next_group_id: u64,
    tokens: TokenMint,
    max_wait: usize,
}

impl PoolInner {
    fn new(options: PoolOptions) -> Self {
        PoolInner {
            groups: HashMap::new(),
            jobs_by_handle: HashMap::new(),
            group_of: HashMap::new(),
            non_full_groups: BTreeMap::new(),
            next_group_id: 0,
            tokens: TokenMint::default(),
            max_wait: options.max_wait,
        }
    }

    fn next_group_id(&mut self) -> GroupId {
        let id = GroupId(self.next_group_id);
        self.next_group_id += 1;
        id
    }

    /// Pop the largest non-full group, if any, out of the size index. The
    /// caller is responsible for reinserting it once its new size is known.
    fn pop_largest_non_full(&mut self) -> Option<GroupId> {
        let (&size, _) = self.non_full_groups.iter().next_back()?;
        let set = self.non_full_groups.get_mut(&size).unwrap();
        let group_id = *set.iter().next().unwrap();
        set.remove(&group_id);
        if set.is_empty() {
            self.non_full_groups.remove(&size);
        }
        Some(group_id)
    }

    /// Remove `group_id` from whichever size bucket it currently occupies
    /// (if any) and reinsert it at `new_size`, unless `new_size` is 0 (the
    /// pool invariant "no empty group is reachable" forbids indexing it) or
    /// `new_size` has reached `max_wait` (a full group is never indexed).
    fn reindex(&mut self, group_id: GroupId, old_size: Option<usize>, new_size: usize) {
        if let Some(old_size) = old_size {
            if let Some(set) = self.non_full_groups.get_mut(&old_size) {
                set.remove(&group_id);
                if set.is_empty() {
                    self.non_full_groups.remove(&old_size);
                }
            }
        }
        if new_size > 0 && new_size < self.max_wait {
            self.non_full_groups.entry(new_size).or_default().insert(group_id);
        }
    }

    /// Wake `group_id`'s worker for a membership change. Idempotent across
    /// back-to-back mutations: if an earlier call already signaled the
    /// group's current cancel event and the worker hasn't observed it yet,
    /// this is a no-op — the worker will see the latest membership regardless
    /// of how many mutations land before it wakes.
    fn wake_group<K: Kernel>(&mut self, kernel: &K, group_id: GroupId) {
        let group = self.groups.get_mut(&group_id).expect("group_of points at a missing group");
        if !group.pending_wake {
            group.pending_wake = true;
            kernel.set_event(group.cancel_event);
        }
        tracing::debug!(?group_id, "woke group for membership change");
    }
}

/// Process-wide registry of handles, callbacks, and groups, protected by a
/// single mutex. Cheap to clone: internally an `Arc` around the shared
/// state, so worker threads can each hold their own handle to it.
pub struct WaitPool<K: Kernel, R: Runtime> {
    inner: Arc<Mutex<PoolInner>>,
    kernel: K,
    runtime: R,
}

impl<K: Kernel, R: Runtime> Clone for WaitPool<K, R> {
    fn clone(&self) -> Self {
        WaitPool {
            inner: Arc::clone(&self.inner),
            kernel: self.kernel.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<K: Kernel, R: Runtime> WaitPool<K, R> {
    pub fn new(kernel: K, runtime: R) -> Self {
        Self::with_options(kernel, runtime, PoolOptions::default())
    }

    pub fn with_options(kernel: K, runtime: R, options: PoolOptions) -> Self {
        WaitPool {
            inner: Arc::new(Mutex::new(PoolInner::new(options))),
            kernel,
            runtime,
        }
    }

    /// `add(handle, callback)`: §4.3.
    pub fn register_wait(&self, handle: Handle, callback: Callback) -> Token {
        let mut inner = self.inner.lock();

        if let Some(jobs) = inner.jobs_by_handle.get_mut(&handle) {
            let token = inner.tokens.mint(handle);
            inner.jobs_by_handle.get_mut(&handle).unwrap().push((token, callback));
            return token;
        }

        let token = inner.tokens.mint(handle);
        let (group_id, is_new_group) = match inner.pop_largest_non_full() {
            Some(id) => (id, false),
            None => {
                let id = inner.next_group_id();
                let cancel_event = self.kernel.create_event().expect("failed to allocate cancel event");
                inner.groups.insert(id, WaitGroup::new(id, cancel_event));
                (id, true)
            }
        };

        let new_size = {
            let group = inner.groups.get_mut(&group_id).expect("just created or popped");
            group.handles.push(handle);
            group.handles.len()
        };
        inner.jobs_by_handle.insert(handle, vec![(token, callback)]);
        inner.group_of.insert(handle, group_id);
        inner.reindex(group_id, None, new_size);

        if is_new_group {
            let worker_pool = self.clone();
            let worker_kernel = self.kernel.clone();
            self.runtime.spawn_background_thread(
                move || group::run_worker(worker_pool, worker_kernel, group_id),
                |outcome| {
                    if let Err(panic) = outcome {
                        tracing::error!(?panic, "wait group worker thread panicked");
                    }
                },
            );
        } else {
            inner.wake_group(&self.kernel, group_id);
        }

        token
    }

    /// `remove(handle, callback) -> bool`: §4.3.
    pub fn unregister_wait(&self, token: Token) -> bool {
        let mut inner = self.inner.lock();
        let handle = token.handle;

        let Some(jobs) = inner.jobs_by_handle.get_mut(&handle) else {
            return false;
        };
        let Some(pos) = jobs.iter().position(|(t, _)| *t == token) else {
            return false;
        };
        jobs.remove(pos);
        if !jobs.is_empty() {
            return true;
        }

        inner.jobs_by_handle.remove(&handle);
        let group_id = inner.group_of.remove(&handle).expect("handle tracked without a group");
        let old_size = {
            let group = inner.groups.get_mut(&group_id).expect("group_of points at a missing group");
            let old_size = group.handles.len();
            group.handles.retain(|h| *h != handle);
            old_size
        };
        let new_size = inner.groups.get(&group_id).unwrap().handles.len();
        inner.wake_group(&self.kernel, group_id);
        inner.reindex(group_id, Some(old_size), new_size);
        true
    }

    /// Probe used by [`crate::wait::WaitForSingleObject`]'s first poll.
    pub(crate) fn is_signaled(&self, handle: Handle) -> Result<bool, OsError> {
        self.kernel.is_signaled(handle)
    }

    /// Worker-side snapshot for step 1 of the worker loop: `[cancel_event, *handles]`.
    pub(crate) fn snapshot_for_wait(&self, group_id: GroupId) -> Vec<Handle> {
        let inner = self.inner.lock();
        let group = inner.groups.get(&group_id).expect("group must exist while its worker runs");
        let mut handles = Vec::with_capacity(group.handles.len() + 1);
        handles.push(group.cancel_event);
        handles.extend_from_slice(&group.handles);
        handles
    }

    /// Worker-side steps 3/4: check whether the cancel event the worker was
    /// just blocked on has fired. If so, this call is what actually swaps in
    /// the replacement event (clearing `pending_wake`) — not the coordinator
    /// that requested the wake — so an event is only ever retired by the one
    /// worker that observed it signaled.
    pub(crate) fn observe_group<K: Kernel>(&self, kernel: &K, group_id: GroupId) -> group::Wake {
        let mut inner = self.inner.lock();
        let group = inner.groups.get_mut(&group_id).expect("group vanished while worker owned it");
        let fired = kernel.is_signaled(group.cancel_event).expect("probing our own cancel event failed");
        if fired {
            let old_cancel_event = group.cancel_event;
            group.cancel_event = kernel.create_event().expect("failed to allocate cancel event");
            group.pending_wake = false;
            group::Wake::Invalidated { old_cancel_event }
        } else {
            group::Wake::RealHandle
        }
    }

    /// Worker-side signal path (step 5): remove the handle at `index` from
    /// the group and the pool's maps, returning it and its callbacks.
    pub(crate) fn execute_and_remove(&self, group_id: GroupId, index: usize) -> (Handle, Vec<Callback>) {
        let mut inner = self.inner.lock();
        let handle = {
            let group = inner.groups.get_mut(&group_id).expect("group vanished while worker owned it");
            group.handles.remove(index)
        };
        inner.group_of.remove(&handle);
        let jobs = inner.jobs_by_handle.remove(&handle).unwrap_or_default();
        let callbacks = jobs.into_iter().map(|(_, cb)| cb).collect();

        let new_size = inner.groups.get(&group_id).unwrap().handles.len();
        // `new_size + 1` is the size before removal; it was never indexed if
        // it equaled `max_wait` (a full group), which `reindex` handles as a
        // harmless no-op lookup.
        inner.reindex(group_id, Some(new_size + 1), new_size);
        (handle, callbacks)
    }

    /// Step 6, checked at the top of every worker iteration rather than only
    /// after step 5: if `group_id`'s handles are empty, remove it from the
    /// pool and hand back its cancel event for the caller to close. A group
    /// is retired by exactly one worker, the one that owns `group_id`, so
    /// this never races with another remover.
    pub(crate) fn retire_if_empty(&self, group_id: GroupId) -> Option<Handle> {
        let mut inner = self.inner.lock();
        let empty = inner.groups.get(&group_id).map(|g| g.handles.is_empty()).unwrap_or(false);
        if empty {
            inner.groups.remove(&group_id).map(|g| g.cancel_event)
        } else {
            None
        }
    }
}

#[cfg(any(test, feature = "testing"))]
impl<K: Kernel, R: Runtime> WaitPool<K, R> {
    /// Number of live groups. Test/debug introspection only.
    pub fn group_count(&self) -> usize {
        self.inner.lock().groups.len()
    }

    /// Sizes of live groups' handle sets, for asserting packing behavior.
    pub fn group_sizes(&self) -> Vec<usize> {
        self.inner.lock().groups.values().map(|g| g.handles.len()).collect()
    }

    /// Whether `handle` is currently tracked by the pool.
    pub fn contains_handle(&self, handle: Handle) -> bool {
        self.inner.lock().jobs_by_handle.contains_key(&handle)
    }
}

impl<K: Kernel, R: Runtime> WaitRegistry for WaitPool<K, R> {
    fn is_signaled(&self, handle: Handle) -> Result<bool, OsError> {
        WaitPool::is_signaled(self, handle)
    }

    fn register_wait(&self, handle: Handle, callback: Callback) -> Token {
        WaitPool::register_wait(self, handle, callback)
    }

    fn unregister_wait(&self, token: Token) -> bool {
        WaitPool::unregister_wait(self, token)
    }
}
