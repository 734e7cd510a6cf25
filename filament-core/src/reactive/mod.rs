//! Reactive Primitives
//!
//! This module implements the core reactive system: observables, dependency
//! tracking, watchers, the status state machine, and the change-driven
//! workers built on top of them.
//!
//! # Concepts
//!
//! ## Observables
//!
//! An Observable is a container for mutable state. Writing a genuinely new
//! value (judged by the deep-equality engine) broadcasts it synchronously to
//! every subscriber, in subscription order. When an observable is read
//! within a tracking context (such as a watcher's function), it
//! automatically registers that context as a dependent.
//!
//! ## Watchers
//!
//! A Watcher is a computation that re-runs whenever one of the observables
//! it read last time broadcasts. Which registrations survive between runs is
//! governed by its `TrackPolicy`.
//!
//! ## Status
//!
//! `Status` and `StatusCell` model the lifecycle of asynchronously loaded
//! data (loading, success, error, empty), with `futurize` driving the whole
//! cycle from one async operation.
//!
//! ## Workers
//!
//! `ever`, `once`, `debounce`, and `interval` wrap a subscription with a
//! delivery schedule.
//!
//! # Implementation Notes
//!
//! Dependency tracking uses a thread-local frame stack: a read checks for an
//! active frame and, if one exists, registers the frame's observer with the
//! observable that was read. Delivery is synchronous on the writer's call
//! path and re-entrant; no lock is held while user callbacks run.

mod observable;
mod observer;
mod status;
mod subscribers;
mod tracking;
mod workers;

pub use observable::Observable;
pub use observer::{Observer, TrackPolicy, Watcher};
pub use status::{Emptiness, FuturizeOptions, Status, StatusCell};
pub use subscribers::{Subscriber, SubscriberList, Subscription, SubscriptionKey};
pub use tracking::{current_observer, is_tracking, report_read, run_tracked};
pub use workers::{debounce, ever, interval, once, WorkerHandle};
