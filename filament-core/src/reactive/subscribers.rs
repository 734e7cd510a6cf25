//! Subscriber List
//!
//! The per-observable registry of active subscriptions. Each registration
//! carries a data callback plus optional error/done callbacks, and is
//! addressed by a stable, generation-checked handle.
//!
//! # Storage
//!
//! Nodes live in an arena (`Vec` of slots with a free list) and are threaded
//! into an intrusive doubly linked list. This gives O(1) append at the tail
//! and O(1) removal by handle with no scanning, while keeping handles safe:
//! a reused slot bumps its generation, so stale handles miss.
//!
//! # Traversal Rules
//!
//! Broadcast passes walk the chain in insertion order. The `next` index is
//! captured before a node's callback runs, and removal during a live pass
//! only marks the node canceled; physical unlink is deferred until the
//! outermost pass finishes. A subscription can therefore cancel itself (or
//! any other) from inside its own callback without skipping or
//! double-invoking its neighbors. Nodes added while a pass is running are
//! linked at the tail but are not delivered by passes that were already in
//! flight when they were added.
//!
//! Callbacks are invoked with no internal lock held, so a callback may add,
//! remove, or trigger nested broadcast passes on the same list; a panicking
//! callback propagates to the caller of the triggering notification.

use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::BroadcastError;

/// One consumer's interest in one observable.
///
/// Built with [`Subscriber::new`] and the chained configuration methods:
///
/// ```rust,ignore
/// let subscriber = Subscriber::new(|value: &i32| println!("{value}"))
///     .on_error(|error| eprintln!("{error}"))
///     .on_done(|| println!("closed"))
///     .cancel_on_error(true);
/// ```
pub struct Subscriber<T> {
    on_data: Arc<dyn Fn(&T) + Send + Sync>,
    on_error: Option<ErrorHandler>,
    on_done: Option<Arc<dyn Fn() + Send + Sync>>,
    cancel_on_error: bool,
}

/// Error callbacks come in two arities; delivery dispatches on which one
/// was registered.
#[derive(Clone)]
enum ErrorHandler {
    Message(Arc<dyn Fn(&BroadcastError) + Send + Sync>),
    WithTrace(Arc<dyn Fn(&BroadcastError, &Backtrace) + Send + Sync>),
}

impl<T> Subscriber<T> {
    /// Create a subscriber with the given data callback.
    pub fn new(on_data: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self {
            on_data: Arc::new(on_data),
            on_error: None,
            on_done: None,
            cancel_on_error: false,
        }
    }

    /// Attach an error callback receiving only the error value.
    pub fn on_error(mut self, handler: impl Fn(&BroadcastError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(ErrorHandler::Message(Arc::new(handler)));
        self
    }

    /// Attach an error callback receiving the error value and a trace.
    ///
    /// When the producer supplied no trace, the callback receives a disabled
    /// backtrace.
    pub fn on_error_with_trace(
        mut self,
        handler: impl Fn(&BroadcastError, &Backtrace) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(ErrorHandler::WithTrace(Arc::new(handler)));
        self
    }

    /// Attach a completion callback, invoked when the observable closes.
    pub fn on_done(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_done = Some(Arc::new(handler));
        self
    }

    /// Cancel this subscription after its first error delivery.
    pub fn cancel_on_error(mut self, cancel: bool) -> Self {
        self.cancel_on_error = cancel;
        self
    }

    fn invoke_data(&self, value: &T) {
        (self.on_data)(value);
    }

    fn invoke_error(&self, error: &BroadcastError, trace: Option<&Backtrace>) {
        match self.on_error {
            Some(ErrorHandler::Message(ref handler)) => handler(error),
            Some(ErrorHandler::WithTrace(ref handler)) => match trace {
                Some(trace) => handler(error, trace),
                None => handler(error, &Backtrace::disabled()),
            },
            None => {}
        }
    }

    fn invoke_done(&self) {
        if let Some(ref handler) = self.on_done {
            handler();
        }
    }

    fn cancels_on_error(&self) -> bool {
        self.cancel_on_error
    }
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            on_data: Arc::clone(&self.on_data),
            on_error: self.on_error.clone(),
            on_done: self.on_done.clone(),
            cancel_on_error: self.cancel_on_error,
        }
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("has_error_handler", &self.on_error.is_some())
            .field("has_done_handler", &self.on_done.is_some())
            .field("cancel_on_error", &self.cancel_on_error)
            .finish()
    }
}

/// Stable handle to one registration in a [`SubscriberList`].
///
/// Handles stay valid across arbitrary additions and removals; once the
/// registration is removed, the handle goes stale and all operations on it
/// report failure instead of touching a reused slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    index: u32,
    generation: u32,
}

/// A node threaded into the intrusive chain.
struct Node<T> {
    subscriber: Subscriber<T>,
    prev: Option<u32>,
    next: Option<u32>,
    /// Logically removed; physically unlinked once no pass is live.
    canceled: bool,
    /// Insertion sequence, used to withhold delivery from passes that
    /// started before this node existed.
    seq: u64,
}

struct Slot<T> {
    generation: u32,
    state: SlotState<T>,
}

enum SlotState<T> {
    Vacant { next_free: Option<u32> },
    Occupied(Node<T>),
}

struct ListCore<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    /// Count of live (non-canceled) registrations.
    len: usize,
    /// Number of broadcast passes currently on the call stack.
    notify_depth: u32,
    /// At least one tombstone awaits the end-of-pass sweep.
    pending_unlink: bool,
    next_seq: u64,
}

impl<T> ListCore<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            head: None,
            tail: None,
            len: 0,
            notify_depth: 0,
            pending_unlink: false,
            next_seq: 0,
        }
    }

    fn key_live(&self, key: SubscriptionKey) -> bool {
        match self.slots.get(key.index as usize) {
            Some(slot) => {
                slot.generation == key.generation
                    && match slot.state {
                        SlotState::Occupied(ref node) => !node.canceled,
                        SlotState::Vacant { .. } => false,
                    }
            }
            None => false,
        }
    }

    fn node_mut(&mut self, index: u32) -> Option<&mut Node<T>> {
        match self.slots.get_mut(index as usize) {
            Some(slot) => match slot.state {
                SlotState::Occupied(ref mut node) => Some(node),
                SlotState::Vacant { .. } => None,
            },
            None => None,
        }
    }

    /// Take the node out of the arena and splice the chain around it.
    ///
    /// Bumps the slot generation so outstanding handles go stale.
    fn detach(&mut self, index: u32) -> Option<Subscriber<T>> {
        let slot = self.slots.get_mut(index as usize)?;
        let state = std::mem::replace(
            &mut slot.state,
            SlotState::Vacant {
                next_free: self.free_head,
            },
        );
        let node = match state {
            SlotState::Occupied(node) => node,
            SlotState::Vacant { next_free } => {
                slot.state = SlotState::Vacant { next_free };
                return None;
            }
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free_head = Some(index);

        match node.prev {
            Some(prev) => {
                if let Some(neighbor) = self.node_mut(prev) {
                    neighbor.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                if let Some(neighbor) = self.node_mut(next) {
                    neighbor.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }
        Some(node.subscriber)
    }

    /// Logically remove a node. Returns whether the node was live, plus a
    /// subscriber to drop outside the lock when the node could be detached
    /// immediately.
    fn cancel(&mut self, index: u32) -> (bool, Option<Subscriber<T>>) {
        if self.notify_depth > 0 {
            let marked = match self.node_mut(index) {
                Some(node) if !node.canceled => {
                    node.canceled = true;
                    true
                }
                _ => false,
            };
            if marked {
                self.pending_unlink = true;
                self.len -= 1;
            }
            (marked, None)
        } else {
            match self.detach(index) {
                Some(subscriber) => {
                    self.len -= 1;
                    (true, Some(subscriber))
                }
                None => (false, None),
            }
        }
    }

    /// Unlink every tombstone. Runs when the outermost pass ends.
    fn sweep(&mut self, dropped: &mut Vec<Subscriber<T>>) {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let (next, canceled) = match self.node_mut(index) {
                Some(node) => (node.next, node.canceled),
                None => (None, false),
            };
            if canceled {
                if let Some(subscriber) = self.detach(index) {
                    dropped.push(subscriber);
                }
            }
            cursor = next;
        }
        self.pending_unlink = false;
    }
}

/// The subscription registry for one observable.
///
/// Cloning shares the underlying arena, so an observable and the handles it
/// issued always reference the same registrations.
pub struct SubscriberList<T> {
    core: Arc<Mutex<ListCore<T>>>,
}

impl<T> SubscriberList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            core: Arc::new(Mutex::new(ListCore::new())),
        }
    }

    /// Append a subscriber at the tail. Returns its handle.
    pub fn add(&self, subscriber: Subscriber<T>) -> SubscriptionKey {
        let mut guard = self.core.lock();
        let core = &mut *guard;

        let seq = core.next_seq;
        core.next_seq += 1;
        let node = Node {
            subscriber,
            prev: core.tail,
            next: None,
            canceled: false,
            seq,
        };

        let index = match core.free_head {
            Some(index) => {
                let slot = &mut core.slots[index as usize];
                let next_free = match slot.state {
                    SlotState::Vacant { next_free } => next_free,
                    SlotState::Occupied(_) => None,
                };
                slot.state = SlotState::Occupied(node);
                core.free_head = next_free;
                index
            }
            None => {
                let index = core.slots.len() as u32;
                core.slots.push(Slot {
                    generation: 0,
                    state: SlotState::Occupied(node),
                });
                index
            }
        };

        match core.tail {
            Some(tail) => {
                if let Some(neighbor) = core.node_mut(tail) {
                    neighbor.next = Some(index);
                }
            }
            None => core.head = Some(index),
        }
        core.tail = Some(index);
        core.len += 1;

        let generation = core.slots[index as usize].generation;
        SubscriptionKey { index, generation }
    }

    /// Remove a registration by handle.
    ///
    /// Returns `false` when the handle is stale (already removed). Removal
    /// during a live pass defers the physical unlink but takes effect
    /// immediately for delivery purposes.
    pub fn remove(&self, key: SubscriptionKey) -> bool {
        let (removed, dropped) = {
            let mut guard = self.core.lock();
            let core = &mut *guard;
            if core.key_live(key) {
                core.cancel(key.index)
            } else {
                (false, None)
            }
        };
        drop(dropped);
        removed
    }

    /// Whether a handle still names a live registration.
    pub fn contains(&self, key: SubscriptionKey) -> bool {
        self.core.lock().key_live(key)
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.core.lock().len
    }

    /// Whether the list has no live registrations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a value to every live subscriber, in insertion order.
    pub fn notify_data(&self, value: &T) {
        self.notify_with(|subscriber| {
            subscriber.invoke_data(value);
            false
        });
    }

    /// Deliver an error to every live subscriber with an error callback.
    ///
    /// Dispatches on the registered callback arity and cancels subscribers
    /// configured with `cancel_on_error` after their delivery.
    pub fn notify_error(&self, error: &BroadcastError, trace: Option<&Backtrace>) {
        self.notify_with(|subscriber| {
            subscriber.invoke_error(error, trace);
            subscriber.cancels_on_error()
        });
    }

    /// Deliver completion to every live subscriber with a done callback.
    pub fn notify_done(&self) {
        self.notify_with(|subscriber| {
            subscriber.invoke_done();
            false
        });
    }

    /// Remove every registration.
    pub fn clear(&self) {
        let dropped = {
            let mut guard = self.core.lock();
            let core = &mut *guard;
            let mut dropped = Vec::new();
            if core.notify_depth > 0 {
                let mut cursor = core.head;
                while let Some(index) = cursor {
                    let next = match core.node_mut(index) {
                        Some(node) => {
                            node.canceled = true;
                            node.next
                        }
                        None => None,
                    };
                    cursor = next;
                }
                core.pending_unlink = true;
            } else {
                let mut cursor = core.head;
                while let Some(index) = cursor {
                    let next = match core.node_mut(index) {
                        Some(node) => node.next,
                        None => None,
                    };
                    if let Some(subscriber) = core.detach(index) {
                        dropped.push(subscriber);
                    }
                    cursor = next;
                }
            }
            core.len = 0;
            dropped
        };
        drop(dropped);
    }

    /// Walk the chain, delivering through `deliver` with no lock held.
    ///
    /// `deliver` returns whether the subscription should be canceled after
    /// this delivery.
    fn notify_with<F>(&self, mut deliver: F)
    where
        F: FnMut(&Subscriber<T>) -> bool,
    {
        let (mut cursor, start_seq) = {
            let mut guard = self.core.lock();
            let core = &mut *guard;
            core.notify_depth += 1;
            (core.head, core.next_seq)
        };
        let _pass = PassGuard { list: self };
        trace!(pass_seq = start_seq, "broadcast pass started");

        while let Some(index) = cursor {
            // Capture `next` before the callback runs; tombstoned removal
            // keeps it valid even if the callback cancels this very node.
            let (next, snapshot) = {
                let guard = self.core.lock();
                match guard.slots.get(index as usize) {
                    Some(slot) => match slot.state {
                        SlotState::Occupied(ref node) => {
                            let snapshot = if node.canceled || node.seq >= start_seq {
                                None
                            } else {
                                Some(node.subscriber.clone())
                            };
                            (node.next, snapshot)
                        }
                        SlotState::Vacant { .. } => (None, None),
                    },
                    None => (None, None),
                }
            };

            if let Some(subscriber) = snapshot {
                if deliver(&subscriber) {
                    self.cancel_index(index);
                }
            }
            cursor = next;
        }
    }

    fn cancel_index(&self, index: u32) {
        let dropped = {
            let mut guard = self.core.lock();
            guard.cancel(index).1
        };
        drop(dropped);
    }
}

impl<T> Default for SubscriberList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SubscriberList<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for SubscriberList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberList")
            .field("len", &self.len())
            .finish()
    }
}

/// Balances the pass counter and sweeps tombstones when the outermost pass
/// ends, on every exit path including unwinding callbacks.
struct PassGuard<'a, T> {
    list: &'a SubscriberList<T>,
}

impl<T> Drop for PassGuard<'_, T> {
    fn drop(&mut self) {
        let dropped = {
            let mut guard = self.list.core.lock();
            let core = &mut *guard;
            core.notify_depth -= 1;
            if core.notify_depth == 0 && core.pending_unlink {
                let mut dropped = Vec::new();
                core.sweep(&mut dropped);
                dropped
            } else {
                Vec::new()
            }
        };
        drop(dropped);
    }
}

/// Type-erased registration handle returned by `listen`/`subscribe`.
///
/// The list owns the registration: dropping a `Subscription` does not cancel
/// it. Cancelation is explicit and idempotent.
pub struct Subscription {
    registration: Arc<dyn Registration>,
}

trait Registration: Send + Sync {
    fn cancel(&self) -> bool;
    fn is_active(&self) -> bool;
}

struct ListRegistration<T> {
    list: SubscriberList<T>,
    key: SubscriptionKey,
}

impl<T: 'static> Registration for ListRegistration<T> {
    fn cancel(&self) -> bool {
        self.list.remove(self.key)
    }

    fn is_active(&self) -> bool {
        self.list.contains(self.key)
    }
}

impl Subscription {
    pub(crate) fn new<T: 'static>(list: SubscriberList<T>, key: SubscriptionKey) -> Self {
        Self {
            registration: Arc::new(ListRegistration { list, key }),
        }
    }

    /// Release the registration. Returns `false` if it was already gone.
    pub fn cancel(&self) -> bool {
        self.registration.cancel()
    }

    /// Whether the registration is still live.
    pub fn is_active(&self) -> bool {
        self.registration.is_active()
    }
}

impl Clone for Subscription {
    fn clone(&self) -> Self {
        Self {
            registration: Arc::clone(&self.registration),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
