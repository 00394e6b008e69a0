//! # Dialog - Bidirectional Message-Driven State Machine Engine
//!
//! A reusable engine that lets a protocol implementation exchange typed
//! inbound and outbound messages with an external peer, suspending on the
//! next message matching a predicate, with per-wait timeouts and a global
//! abort/reset operation.
//!
//! ## Features
//!
//! - **Predicate waits**: suspend until the first inbound message matching
//!   a caller-supplied predicate, racing a per-wait deadline
//! - **Early-message buffering**: messages published before any subscriber
//!   exists are held and flushed, in order, to the first subscriber
//! - **Fan-out channels**: every subscriber receives every message, in
//!   publish order; duplicate registration is legal
//! - **Abort/reset**: one cancellation primitive that rejects all pending
//!   waits and restarts the protocol from its initial state
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  Machine<P>                      │
//! │  (lifecycle controller: spawn / abort / state)   │
//! └────────┬───────────────────────────┬────────────┘
//!          │                           │
//!          ▼                           ▼
//! ┌─────────────────┐       ┌──────────────────────┐
//! │   Channels      │       │   Protocol::run      │
//! │ inbound/outbound│◄─────►│  write / wait_for /  │
//! │ error/state     │       │  set_state           │
//! └─────────────────┘       └──────────────────────┘
//! ```
//!
//! Concurrency is cooperative: exactly one protocol coroutine runs per
//! machine, suspension happens only at `wait_for` points, and every
//! publish/subscribe mutation completes synchronously. Each machine owns
//! its channels and registries exclusively.
//!
//! ## Event Kinds
//!
//! | Kind           | Carries                         | Published by        |
//! |----------------|---------------------------------|---------------------|
//! | `inbound`      | Peer messages                   | `inject_inbound`    |
//! | `outbound`     | Protocol messages               | `Context::write`    |
//! | `error`        | Broadcast run failures          | Lifecycle controller|
//! | `state-changed`| Machine state transitions       | `set_state`         |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dialog::{Context, EngineConfig, Machine, Protocol, Result};
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
//!         Ok(())
//!     }
//! }
//!
//! # async fn demo() -> Result<()> {
//! let machine = Machine::spawn(VersionHandshake, EngineConfig::default());
//!
//! // Peer side: await what the protocol sends, then answer it.
//! let request = machine.observe_outbound(|m| m["kind"] == "get_version").await?;
//! machine.inject_inbound(json!({"type": "version", "value": "1.2"}));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Model
//!
//! | Error              | Meaning                          | Handling          |
//! |--------------------|----------------------------------|-------------------|
//! | `Timeout`          | Wait deadline elapsed            | Propagated to wait caller |
//! | `Aborted`          | Wait preempted by `abort()`      | Propagated to wait caller, swallowed at lifecycle boundary |
//! | `InvalidEventKind` | Unknown kind name from input     | Fail fast         |
//! | `Protocol`         | Implementor's `run` failed       | Broadcast on error channel |
//!
//! ## Modules
//!
//! - [`channel`]: Per-kind subscriber lists and early-message buffering
//! - [`machine`]: Lifecycle controller, predicate waiter, abort/reset
//! - [`protocol`]: The contract a handshake implementation supplies
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod channel;
pub mod config;
pub mod error;
pub mod machine;
pub mod protocol;

// Re-exports for convenience
pub use channel::{Channel, EventKind, SubscriberId, Subscription};
pub use config::{EngineConfig, DEFAULT_WAIT_TIMEOUT_MS};
pub use error::{EngineError, Result};
pub use machine::{Machine, MachineState};
pub use protocol::{Context, Protocol};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
