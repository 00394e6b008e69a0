//! Machine lifecycle: driving a protocol to completion, abort, and restart.
//!
//! A [`Machine`] owns one protocol coroutine and the channels it exchanges
//! messages over. Concurrency comes from suspension at `wait_for` points,
//! not from parallel execution: exactly one protocol task runs per machine,
//! and `write`/`inject_inbound`/`subscribe` are synchronous.
//!
//! # State Machine
//!
//! ```text
//!                    spawn()
//!     [Started] ───────────────────> run()
//!         ▲                            │
//!         │ abort()                    │ Ok(())       set_state(s)
//!         │ (reset hook,               ▼                   │
//!         │  waits rejected)      [Completed]              ▼
//!         └───────────────────────────┴─────────────── [Phase(s)]
//! ```
//!
//! | State        | Description                           | Valid Transitions     |
//! |--------------|---------------------------------------|-----------------------|
//! | `Started`    | Protocol running from its entry point | → Phase(_), Completed |
//! | `Phase(s)`   | Implementor-defined progress marker   | → Phase(_), Completed |
//! | `Completed`  | `run` returned `Ok`; terminal         | → Started (abort)     |
//!
//! `abort()` is orthogonal: from any state it rejects every pending wait
//! with `Aborted`, clears the inbound channel, invokes the protocol's
//! `reset` hook, and re-runs `run` from scratch. The protocol's locals are
//! not preserved across an abort.
//!
//! # Scheduling
//!
//! [`Machine::spawn`] starts the driver on a fresh tokio task, so the
//! protocol never runs inline during construction; the caller keeps control
//! until its own task yields and can attach subscribers first.

mod lifecycle;
mod shared;
mod state;
mod waiter;

pub use lifecycle::Machine;
pub use state::MachineState;

pub(crate) use shared::Shared;
pub(crate) use waiter::wait_for_match;
