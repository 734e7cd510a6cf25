//! Observable Implementation
//!
//! An Observable is a value cell that broadcasts to its subscribers when the
//! value changes.
//!
//! # How Observables Work
//!
//! 1. Reads made inside a tracked computation (see
//!    [`tracking`](super::tracking)) subscribe that computation to the
//!    observable. Reads outside any tracked computation are plain reads.
//!
//! 2. [`set`](Observable::set) compares the new value against the current
//!    one with [`DeepEq`] and broadcasts only on a real change. Collections
//!    compare structurally, so replacing a set with the same elements in a
//!    different order is not a change.
//!
//! 3. [`trigger`](Observable::trigger), [`update`](Observable::update) and
//!    [`refresh`](Observable::refresh) bypass the equality gate for the
//!    cases where a broadcast is wanted regardless.
//!
//! Broadcasts are synchronous and re-entrant: a listener may read, write,
//! subscribe, or cancel on the same observable from inside its callback. The
//! value lock is never held while listeners run.
//!
//! # Lifecycle
//!
//! [`close`](Observable::close) delivers completion to every subscriber and
//! empties the list. Closing twice is an error. A closed observable forbids
//! further use: reads, writes, and new subscriptions all panic with a
//! descriptive message, with [`try_set`](Observable::try_set)/
//! [`try_get`](Observable::try_get) as the non-panicking variants.
//!
//! # Example
//!
//! ```rust,ignore
//! let count = Observable::new(0);
//!
//! let subscription = count.listen(|value| println!("count = {value}"));
//! count.set(5);       // Prints: "count = 5"
//! count.set(5);       // No change, no broadcast
//! subscription.cancel();
//! ```

use std::backtrace::Backtrace;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::equality::DeepEq;
use crate::error::{BroadcastError, ObservableError};

use super::subscribers::{Subscriber, SubscriberList, Subscription};
use super::tracking;

/// Counter for generating unique observable IDs.
static OBSERVABLE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique observable ID.
fn next_observable_id() -> u64 {
    OBSERVABLE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A reactive value cell.
///
/// Cloning an `Observable` produces another handle to the same cell: the
/// value, the subscriber list, and the closed flag are shared.
pub struct Observable<T> {
    /// Unique identifier, also used as the tracking source ID.
    id: u64,
    value: Arc<Mutex<T>>,
    subscribers: SubscriberList<T>,
    closed: Arc<AtomicBool>,
}

impl<T> Observable<T>
where
    T: DeepEq + Clone + Send + Sync + 'static,
{
    /// Create an observable holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            id: next_observable_id(),
            value: Arc::new(Mutex::new(value)),
            subscribers: SubscriberList::new(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the observable's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Read the value, subscribing the current tracked computation.
    pub fn get(&self) -> T {
        self.assert_open("read");
        tracking::report_read(&self.subscribers, self.id);
        self.value.lock().clone()
    }

    /// Borrow the value through `f`, subscribing the current tracked
    /// computation. Avoids the clone that [`get`](Self::get) makes.
    ///
    /// The value lock is held while `f` runs, so `f` must not write back
    /// into this observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.assert_open("read");
        tracking::report_read(&self.subscribers, self.id);
        f(&self.value.lock())
    }

    /// Read the value without subscribing anything.
    pub fn get_untracked(&self) -> T {
        self.assert_open("read");
        self.value.lock().clone()
    }

    /// Borrow the value through `f` without subscribing anything.
    ///
    /// Same locking rule as [`with`](Self::with).
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.assert_open("read");
        f(&self.value.lock())
    }

    /// Replace the value if it differs from the current one.
    ///
    /// Equality is [`DeepEq`]: structural, order-insensitive for sets and
    /// maps. Returns whether the value changed (and was broadcast).
    pub fn set(&self, value: T) -> bool {
        self.assert_open("set");
        let snapshot = {
            let mut guard = self.value.lock();
            if guard.deep_eq(&value) {
                return false;
            }
            *guard = value;
            guard.clone()
        };
        self.subscribers.notify_data(&snapshot);
        true
    }

    /// Replace the value and broadcast unconditionally.
    pub fn trigger(&self, value: T) {
        self.assert_open("trigger");
        let snapshot = {
            let mut guard = self.value.lock();
            *guard = value;
            guard.clone()
        };
        self.subscribers.notify_data(&snapshot);
    }

    /// Mutate the value in place and broadcast unconditionally.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.assert_open("update");
        let snapshot = {
            let mut guard = self.value.lock();
            f(&mut *guard);
            guard.clone()
        };
        self.subscribers.notify_data(&snapshot);
    }

    /// Mutate the value in place without broadcasting.
    pub fn update_silent(&self, f: impl FnOnce(&mut T)) {
        self.assert_open("update");
        f(&mut *self.value.lock());
    }

    /// Broadcast the current value to every subscriber.
    pub fn refresh(&self) {
        self.assert_open("refresh");
        let snapshot = self.value.lock().clone();
        self.subscribers.notify_data(&snapshot);
    }

    /// Mutate through `f`, broadcasting only when `f` says the value
    /// changed. `f` returns its result paired with the changed flag.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut T) -> (R, bool)) -> R {
        self.assert_open("update");
        let (result, snapshot) = {
            let mut guard = self.value.lock();
            let (result, changed) = f(&mut *guard);
            let snapshot = if changed { Some(guard.clone()) } else { None };
            (result, snapshot)
        };
        if let Some(snapshot) = snapshot {
            self.subscribers.notify_data(&snapshot);
        }
        result
    }

    /// Subscribe a data callback. Returns the subscription handle.
    pub fn listen(&self, on_data: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.subscribe(Subscriber::new(on_data))
    }

    /// Subscribe a fully configured [`Subscriber`].
    pub fn subscribe(&self, subscriber: Subscriber<T>) -> Subscription {
        self.assert_open("subscribe");
        let key = self.subscribers.add(subscriber);
        Subscription::new(self.subscribers.clone(), key)
    }

    /// Broadcast an error to subscribers with error callbacks.
    ///
    /// Two-argument error callbacks receive a disabled backtrace.
    pub fn add_error(&self, error: impl Into<BroadcastError>) {
        self.assert_open("broadcast an error");
        self.subscribers.notify_error(&error.into(), None);
    }

    /// Broadcast an error along with a captured backtrace.
    pub fn add_error_with_trace(&self, error: impl Into<BroadcastError>, trace: &Backtrace) {
        self.assert_open("broadcast an error");
        self.subscribers.notify_error(&error.into(), Some(trace));
    }

    /// Close the observable: deliver completion, then drop every
    /// subscription.
    ///
    /// Fails with [`ObservableError::AlreadyClosed`] on a second close.
    pub fn close(&self) -> Result<(), ObservableError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ObservableError::AlreadyClosed);
        }
        debug!(observable = self.id, "closed");
        self.subscribers.notify_done();
        self.subscribers.clear();
        Ok(())
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Like [`get`](Self::get), but reports a closed observable instead of
    /// reading through it.
    pub fn try_get(&self) -> Result<T, ObservableError> {
        if self.is_closed() {
            return Err(ObservableError::Closed);
        }
        Ok(self.get())
    }

    /// Like [`set`](Self::set), but returns an error on a closed observable
    /// instead of panicking.
    pub fn try_set(&self, value: T) -> Result<bool, ObservableError> {
        if self.is_closed() {
            return Err(ObservableError::Closed);
        }
        Ok(self.set(value))
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn assert_open(&self, op: &str) {
        assert!(
            !self.closed.load(Ordering::SeqCst),
            "observable {} cannot {op} after close",
            self.id,
        );
    }
}

impl Observable<bool> {
    /// Invert the value and broadcast. Returns the new value.
    pub fn toggle(&self) -> bool {
        self.assert_open("toggle");
        let snapshot = {
            let mut guard = self.value.lock();
            *guard = !*guard;
            *guard
        };
        self.subscribers.notify_data(&snapshot);
        snapshot
    }
}

impl<T> Default for Observable<T>
where
    T: DeepEq + Clone + Send + Sync + Default + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Observable<T>
where
    T: DeepEq + Clone + Send + Sync + 'static,
{
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            subscribers: self.subscribers.clone(),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.id)
            .field("value", &*self.value.lock())
            .field("subscribers", &self.subscribers.len())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
