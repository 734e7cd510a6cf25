//! Filament Core
//!
//! This crate provides the reactive state core of the Filament framework.
//! It implements:
//!
//! - Observables with deep-equality write gating and synchronous broadcast
//! - Automatic dependency tracking and auto-rerunning watchers
//! - A status state machine for asynchronously loaded data
//! - Reactive list/set/map adapters
//! - Change-driven workers (`ever`, `once`, `debounce`, `interval`)
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `equality`: the structural deep-equality and hashing engine behind
//!   every "is this a new value" decision
//! - `error`: shared error types
//! - `reactive`: observables, tracking, watchers, status, workers
//! - `collections`: reactive collection adapters
//!
//! # Example
//!
//! ```rust,ignore
//! use filament_core::reactive::{Observable, Watcher};
//!
//! // Create an observable
//! let count = Observable::new(0);
//!
//! // Watch it; the closure runs now and after every change
//! let watcher = Watcher::new({
//!     let count = count.clone();
//!     move || println!("count = {}", count.get())
//! });
//!
//! count.set(5);   // Watcher re-runs, prints: "count = 5"
//! count.set(5);   // Equal value: no broadcast, no re-run
//! drop(watcher);  // Releases its subscriptions
//! ```

pub mod collections;
pub mod equality;
pub mod error;
pub mod reactive;
