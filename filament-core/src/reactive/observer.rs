//! Observers and Watchers
//!
//! An [`Observer`] is the consumer side of dependency tracking: it owns the
//! subscriptions created on its behalf while a tracked computation runs, and
//! carries the notification hook those subscriptions fire.
//!
//! A [`Watcher`] is the ready-made autorun built on top of an observer.
//!
//! # How Watchers Work
//!
//! 1. When created, the watcher runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. Every observable read during the run subscribes the watcher to that
//!    observable.
//!
//! 3. When any dependency broadcasts, the watcher re-runs. Re-runs triggered
//!    while a run is already on the stack are coalesced into one follow-up
//!    run instead of recursing.
//!
//! # Subscription Policy
//!
//! [`TrackPolicy`] controls what happens to the previous run's subscriptions
//! when a new run starts:
//!
//! - `ClearBeforeTrack` (the default) releases them first, so the dependency
//!   set always mirrors the most recent run. A branch that stops reading an
//!   observable stops re-running because of it.
//! - `Accumulate` keeps them, so the dependency set only ever grows. This
//!   trades precision for cheaper re-runs on stable dependency sets.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use super::subscribers::Subscription;
use super::tracking::run_tracked;

/// Counter for generating unique observer IDs.
static OBSERVER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique observer ID.
fn next_observer_id() -> u64 {
    OBSERVER_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// What a new tracked run does with the subscriptions of the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackPolicy {
    /// Release the previous run's subscriptions before tracking anew.
    #[default]
    ClearBeforeTrack,
    /// Keep previous subscriptions; tracking only ever adds.
    Accumulate,
}

#[derive(Default)]
struct Tracked {
    subscriptions: Vec<Subscription>,
    /// IDs of sources already subscribed to, so one run of a computation
    /// that reads the same observable twice registers once.
    sources: HashSet<u64>,
}

struct ObserverInner {
    id: u64,
    policy: TrackPolicy,
    /// Invoked by every subscription this observer holds.
    hook: Box<dyn Fn() + Send + Sync>,
    tracked: Mutex<Tracked>,
}

/// The consumer side of dependency tracking.
///
/// Most code never builds one directly; [`Watcher`] does, and hands it to
/// [`run_tracked`](super::tracking::run_tracked) around its function.
pub struct Observer {
    inner: Arc<ObserverInner>,
}

impl Observer {
    /// Create an observer with the given policy and notification hook.
    pub fn new<F>(policy: TrackPolicy, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ObserverInner {
                id: next_observer_id(),
                policy,
                hook: Box::new(hook),
                tracked: Mutex::new(Tracked::default()),
            }),
        }
    }

    /// Get the observer's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the observer's subscription policy.
    pub fn policy(&self) -> TrackPolicy {
        self.inner.policy
    }

    /// Fire the notification hook.
    pub fn notify(&self) {
        (self.inner.hook)();
    }

    /// Whether this observer already subscribed to the given source during
    /// its current dependency set.
    pub(crate) fn tracks_source(&self, source: u64) -> bool {
        self.inner.tracked.lock().sources.contains(&source)
    }

    /// Take ownership of a subscription made on this observer's behalf.
    ///
    /// A duplicate registration for an already-tracked source is canceled
    /// instead of stored.
    pub(crate) fn record(&self, source: u64, subscription: Subscription) {
        let duplicate = {
            let mut tracked = self.inner.tracked.lock();
            if tracked.sources.insert(source) {
                tracked.subscriptions.push(subscription.clone());
                false
            } else {
                true
            }
        };
        if duplicate {
            subscription.cancel();
        }
    }

    /// Apply the policy at the start of a tracked run.
    pub(crate) fn begin_tracking(&self) {
        match self.inner.policy {
            TrackPolicy::ClearBeforeTrack => self.clear_subscriptions(),
            TrackPolicy::Accumulate => {}
        }
    }

    /// Release every subscription this observer holds.
    ///
    /// The cancellations run after the internal lock is released, so this is
    /// safe to call from inside a broadcast pass.
    pub fn clear_subscriptions(&self) {
        let released = {
            let mut tracked = self.inner.tracked.lock();
            std::mem::take(&mut *tracked)
        };
        for subscription in &released.subscriptions {
            subscription.cancel();
        }
    }

    /// Number of subscriptions currently held.
    pub fn subscription_count(&self) -> usize {
        self.inner.tracked.lock().subscriptions.len()
    }
}

impl Clone for Observer {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id())
            .field("policy", &self.policy())
            .field("subscription_count", &self.subscription_count())
            .finish()
    }
}

struct WatcherCore {
    observer: Observer,
    /// The watched function.
    run: Box<dyn Fn() + Send + Sync>,
    /// A run is currently on the stack.
    running: AtomicBool,
    /// A notification arrived during the current run.
    pending: AtomicBool,
    /// Whether the watcher has been disposed.
    disposed: AtomicBool,
    /// Number of times the function has run.
    run_count: AtomicUsize,
}

impl WatcherCore {
    fn execute(core: &Arc<WatcherCore>) {
        if core.disposed.load(Ordering::SeqCst) {
            return;
        }
        if core.running.swap(true, Ordering::SeqCst) {
            // Notified from inside the active run; fold into one follow-up.
            core.pending.store(true, Ordering::SeqCst);
            return;
        }
        // Cleared on every exit path: a panicking run propagates to the
        // writer, and a later notification must still re-run the watcher.
        let _running = RunGuard { core: core.as_ref() };
        loop {
            run_tracked(&core.observer, || (core.run)());
            core.run_count.fetch_add(1, Ordering::SeqCst);
            if core.disposed.load(Ordering::SeqCst) || !core.pending.swap(false, Ordering::SeqCst)
            {
                break;
            }
        }
    }
}

/// Resets the run flag when an execute pass ends, including unwinding runs.
struct RunGuard<'a> {
    core: &'a WatcherCore,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.core.running.store(false, Ordering::SeqCst);
    }
}

/// A computation that re-runs whenever one of its dependencies broadcasts.
///
/// # Example
///
/// ```rust,ignore
/// let name = Observable::new(String::from("ada"));
///
/// let watcher = Watcher::new({
///     let name = name.clone();
///     move || println!("hello, {}", name.get())
/// });
///
/// name.set(String::from("grace"));  // Prints: "hello, grace"
/// drop(watcher);                    // Releases all subscriptions
/// ```
pub struct Watcher {
    core: Arc<WatcherCore>,
}

impl Watcher {
    /// Create a watcher with the default policy and run it immediately.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_policy(TrackPolicy::default(), run)
    }

    /// Create a watcher with an explicit subscription policy.
    pub fn with_policy<F>(policy: TrackPolicy, run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let core = Arc::new_cyclic(|weak: &Weak<WatcherCore>| {
            let hook = weak.clone();
            let observer = Observer::new(policy, move || {
                if let Some(core) = hook.upgrade() {
                    WatcherCore::execute(&core);
                }
            });
            WatcherCore {
                observer,
                run: Box::new(run),
                running: AtomicBool::new(false),
                pending: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
            }
        });

        // Run immediately to establish dependencies
        WatcherCore::execute(&core);

        Self { core }
    }

    /// Get the watcher's unique ID.
    pub fn id(&self) -> u64 {
        self.core.observer.id()
    }

    /// Number of times the watched function has run.
    pub fn run_count(&self) -> usize {
        self.core.run_count.load(Ordering::SeqCst)
    }

    /// Number of observables the watcher is currently subscribed to.
    pub fn dependency_count(&self) -> usize {
        self.core.observer.subscription_count()
    }

    /// Stop re-running and release every subscription.
    pub fn dispose(&self) {
        if self.core.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(watcher = self.id(), "watcher disposed");
        self.core.observer.clear_subscriptions();
    }

    /// Check if the watcher has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.core.disposed.load(Ordering::SeqCst)
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
