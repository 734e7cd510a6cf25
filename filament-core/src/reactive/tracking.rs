//! Dependency Tracking
//!
//! Connects observable reads to the observer whose computation is currently
//! running, through a thread-local stack of tracking frames.
//!
//! # How Tracking Works
//!
//! 1. [`run_tracked`] pushes a frame naming the observer, runs the body, and
//!    pops the frame when the body finishes (also on unwind).
//!
//! 2. Every tracked read inside the body calls [`report_read`], which
//!    subscribes the innermost frame's observer to the observable that was
//!    read. Repeated reads of the same observable register once.
//!
//! 3. A read with no frame on the stack is a plain read and registers
//!    nothing. This is what makes passive access (`get_untracked`) and
//!    tracked access the same code path apart from the report.
//!
//! Frames nest: a tracked body can start another tracked run, and reads
//! inside the inner body attribute to the inner observer only.

use std::cell::RefCell;

use tracing::trace;

use super::observer::Observer;
use super::subscribers::{Subscriber, SubscriberList, Subscription};

thread_local! {
    static TRACKING_STACK: RefCell<Vec<Frame>> = RefCell::new(Vec::new());
}

struct Frame {
    observer: Observer,
}

/// Pops the frame pushed by [`run_tracked`], on every exit path.
struct FrameGuard {
    id: u64,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        TRACKING_STACK.with(|stack| {
            let frame = stack.borrow_mut().pop();
            debug_assert_eq!(
                frame.map(|frame| frame.observer.id()),
                Some(self.id),
                "tracking frames must unwind in LIFO order",
            );
        });
    }
}

/// Run `body` with `observer` as the innermost tracking frame.
///
/// Applies the observer's [`TrackPolicy`](super::observer::TrackPolicy)
/// first, then collects a subscription for every observable the body reads.
/// Returns the body's value.
pub fn run_tracked<R, F>(observer: &Observer, body: F) -> R
where
    F: FnOnce() -> R,
{
    observer.begin_tracking();
    TRACKING_STACK.with(|stack| {
        stack.borrow_mut().push(Frame {
            observer: observer.clone(),
        });
    });
    let _guard = FrameGuard { id: observer.id() };
    body()
}

/// Whether a tracking frame is currently on this thread's stack.
pub fn is_tracking() -> bool {
    TRACKING_STACK.with(|stack| !stack.borrow().is_empty())
}

/// The observer of the innermost tracking frame, if any.
pub fn current_observer() -> Option<Observer> {
    TRACKING_STACK.with(|stack| stack.borrow().last().map(|frame| frame.observer.clone()))
}

/// Report a read of the observable backed by `list`.
///
/// With no frame on the stack this is a no-op. Otherwise the innermost
/// observer subscribes to `list`, unless it already tracks `source` in its
/// current dependency set. The registered callback fires the observer's
/// notification hook on every data broadcast.
pub fn report_read<T: 'static>(list: &SubscriberList<T>, source: u64) {
    let observer = match current_observer() {
        Some(observer) => observer,
        None => return,
    };
    if observer.tracks_source(source) {
        return;
    }

    trace!(source, observer = observer.id(), "tracked read registered");
    let notifier = observer.clone();
    let key = list.add(Subscriber::new(move |_| notifier.notify()));
    observer.record(source, Subscription::new(list.clone(), key));
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
