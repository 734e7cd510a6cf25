//! Workers
//!
//! Change-driven helpers layered on [`Observable`] subscriptions: run a
//! callback on every broadcast, only on the first, only after a quiet
//! window, or at most once per period.
//!
//! `ever`, `once`, and `interval` are plain subscriptions and deliver
//! synchronously on the broadcasting call path. `debounce` moves delivery
//! onto a tokio task so the quiet window can be timed; its [`WorkerHandle`]
//! aborts the task on dispose or drop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::equality::DeepEq;

use super::observable::Observable;
use super::subscribers::Subscription;

/// Invoke `callback` on every broadcast.
pub fn ever<T, F>(observable: &Observable<T>, callback: F) -> Subscription
where
    T: DeepEq + Clone + Send + Sync + 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    observable.listen(callback)
}

/// Invoke `callback` on the first broadcast only.
///
/// The registration cancels itself from inside its own callback; the
/// returned handle can cancel it earlier.
pub fn once<T, F>(observable: &Observable<T>, callback: F) -> Subscription
where
    T: DeepEq + Clone + Send + Sync + 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    let fired = Arc::new(AtomicBool::new(false));
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    let subscription = observable.listen({
        let fired = Arc::clone(&fired);
        let slot = Arc::clone(&slot);
        move |value| {
            if fired.swap(true, Ordering::SeqCst) {
                return;
            }
            callback(value);
            if let Some(subscription) = slot.lock().take() {
                subscription.cancel();
            }
        }
    });
    *slot.lock() = Some(subscription.clone());
    subscription
}

/// Invoke `callback` with the latest value once the observable has been
/// quiet for `delay`.
///
/// Values are forwarded to a tokio task; a newer broadcast inside the quiet
/// window replaces the pending one and restarts the window. A value still
/// inside its window when the worker is disposed is dropped.
pub fn debounce<T, F>(observable: &Observable<T>, delay: Duration, callback: F) -> WorkerHandle
where
    T: DeepEq + Clone + Send + Sync + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = observable.listen(move |value: &T| {
        let _ = tx.send(value.clone());
    });

    debug!(observable = observable.id(), ?delay, "debounce worker started");
    let task = tokio::spawn(async move {
        while let Some(mut latest) = rx.recv().await {
            loop {
                match tokio::time::timeout(delay, rx.recv()).await {
                    // A newer value restarts the quiet window.
                    Ok(Some(newer)) => latest = newer,
                    // Channel closed with a value still in its window.
                    Ok(None) => return,
                    // Quiet window elapsed.
                    Err(_) => break,
                }
            }
            callback(latest);
        }
    });

    WorkerHandle { subscription, task }
}

/// Invoke `callback` at most once per `period`, on the leading edge.
///
/// The first broadcast delivers immediately; broadcasts inside the period
/// that follows are suppressed entirely (not queued).
pub fn interval<T, F>(observable: &Observable<T>, period: Duration, callback: F) -> Subscription
where
    T: DeepEq + Clone + Send + Sync + 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    let last_fire: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
    observable.listen(move |value| {
        let now = Instant::now();
        // Decide under the lock, deliver outside it.
        let due = {
            let mut last = last_fire.lock();
            match *last {
                Some(previous) if now.duration_since(previous) < period => false,
                _ => {
                    *last = Some(now);
                    true
                }
            }
        };
        if due {
            callback(value);
        }
    })
}

/// Handle to a worker backed by a tokio task.
///
/// Unlike a plain [`Subscription`], dropping the handle disposes the worker:
/// an orphaned timing task has nothing left to deliver to.
pub struct WorkerHandle {
    subscription: Subscription,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Cancel the subscription and abort the task.
    pub fn dispose(&self) {
        self.subscription.cancel();
        self.task.abort();
    }

    /// Whether the worker can still deliver.
    pub fn is_active(&self) -> bool {
        self.subscription.is_active() && !self.task.is_finished()
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
