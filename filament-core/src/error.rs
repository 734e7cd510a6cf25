//! Error types shared across the reactive core.
//!
//! Misuse of a closed observable is a programming bug and fails fast; the
//! ergonomic accessors panic with a descriptive message, while the `try_`
//! variants surface [`ObservableError`] for callers that prefer to handle it.

use thiserror::Error;

/// Errors produced by observable lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ObservableError {
    /// The observable was closed and can no longer be read or written.
    #[error("observable is closed")]
    Closed,

    /// `close` was called on an observable that was already closed.
    #[error("observable was already closed")]
    AlreadyClosed,
}

/// An error value delivered to subscriber error callbacks.
///
/// Producers push these onto an observable's error channel; they carry a
/// human-readable description rather than a structured payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BroadcastError {
    message: String,
}

impl BroadcastError {
    /// Create an error from any printable description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error's description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for BroadcastError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for BroadcastError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// The cause carried by an error status.
///
/// Failures reaching the status machine are flattened to a message; the
/// original failure value is not retained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StatusError {
    message: String,
}

impl StatusError {
    /// Create an error status cause from any printable description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure's description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for StatusError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for StatusError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
