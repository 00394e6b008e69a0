//! The protocol contract: what a handshake implementation supplies.
//!
//! A protocol is the one piece the engine does not provide: the concrete
//! sequence of sends and waits that makes up a handshake with a peer. It
//! is written as an async `run` hook composed from the [`Context`]
//! operations, plus a `reset` hook for compensating work before a restart.
//!
//! # Message Flow
//!
//! ```text
//! Peer (or test harness)              Machine              Protocol::run
//!    |                                   |                       |
//!    |                                   |<----- write(out) -----|
//!    |<-- observe_outbound resolves ----|                       |
//!    |                                   |                       |
//!    |------ inject_inbound(msg) ------->|                       |
//!    |                                   |--- wait_for match --->|
//!    |                                   |                       |
//!    |                                   |<--- run returns Ok ---|
//!    |                                   |  state = Completed    |
//! ```
//!
//! Messages are opaque, application-defined payloads; the engine never
//! inspects them beyond the predicates the implementor supplies.
//!
//! # Example
//!
//! ```rust,ignore
//! use dialog::{Context, Protocol, Result};
//! use serde_json::{json, Value};
//!
//! struct VersionHandshake;
//!
//! impl Protocol for VersionHandshake {
//!     type In = Value;
//!     type Out = Value;
//!     type State = &'static str;
//!
//!     async fn run(&mut self, cx: &Context<Self>) -> Result<()> {
//!         cx.write(json!({"kind": "get_version"}));
//!         let version = cx.wait_for(|m| m["type"] == "version").await?;
//!         cx.set_state("versioned");
//!         tracing::debug!(?version, "peer version received");
//!         Ok(())
//!     }
//! }
//! ```

mod context;

pub use context::Context;

use std::future::Future;

use crate::error::Result;

/// A concrete handshake run by a [`Machine`](crate::Machine).
///
/// `run` is re-invoked from scratch after every abort; implementations must
/// not rely on locals surviving a restart. No error triggers an automatic
/// retry — re-attempts are driven explicitly inside `run`.
pub trait Protocol: Send + Sized + 'static {
    /// Inbound message type (received from the peer).
    type In: Clone + Send + 'static;
    /// Outbound message type (written toward the peer).
    type Out: Clone + Send + 'static;
    /// Implementor-defined intermediate states.
    type State: Clone + Send + std::fmt::Debug + 'static;

    /// The handshake logic, composed from [`Context::write`] and
    /// [`Context::wait_for`].
    ///
    /// Returning `Ok` marks the machine `Completed`. Any error other than
    /// `Aborted` is broadcast on the error channel; `Aborted` (propagated
    /// out of an interrupted wait with `?`) is swallowed by the lifecycle
    /// controller, which then restarts the protocol on the abort's queued
    /// restart request.
    fn run(&mut self, cx: &Context<Self>) -> impl Future<Output = Result<()>> + Send;

    /// Compensating action before a restart after abort, e.g. notifying
    /// the peer. Defaults to doing nothing.
    fn reset(&mut self, _cx: &Context<Self>) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}
