//! Engine error types.
//!
//! Errors follow the tagged-result model: cancellation is an ordinary
//! `EngineError::Aborted` value threaded through every suspend point, not a
//! distinguished exception type. Callers branch on [`EngineError::is_aborted`]
//! rather than downcasting.

use std::time::Duration;

use thiserror::Error;

use crate::channel::EventKind;

/// Errors produced by the dialog engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A wait's deadline elapsed before any message matched its predicate.
    #[error("timed out after {timeout:?} waiting for {kind} message")]
    Timeout {
        /// Channel the wait was attached to.
        kind: EventKind,
        /// Deadline that elapsed.
        timeout: Duration,
    },

    /// A pending wait was preempted by [`Machine::abort`](crate::Machine::abort).
    ///
    /// This is the expected artifact of caller-triggered cancellation. It
    /// propagates to the interrupted `wait_for` caller but is swallowed at
    /// the lifecycle boundary instead of being broadcast as a fault.
    #[error("wait aborted")]
    Aborted,

    /// An event-kind name from external input did not parse.
    ///
    /// Programmer error; fails fast, never recovered. Internal dispatch is
    /// enum-keyed, so this can only arise when parsing kind names from
    /// external input (e.g. configuration or log filters).
    #[error("unknown event kind: {0}")]
    InvalidEventKind(String),

    /// The protocol implementation failed for a reason of its own.
    #[error("protocol failure: {0}")]
    Protocol(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Whether this error is the cancellation marker.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Whether this error is a wait deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
