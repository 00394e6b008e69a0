//! The machine handle and its driver task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::shared::Shared;
use super::state::MachineState;
use super::waiter::wait_for_match;
use crate::channel::Subscription;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::protocol::{Context, Protocol};

/// One instance of the state-machine engine running one protocol.
///
/// The protocol coroutine is spawned onto the runtime at construction and
/// first polled only after the caller's task yields, so subscribers
/// attached immediately after [`Machine::spawn`] observe the run from the
/// beginning. Dropping the machine aborts the driver task.
///
/// # Example
///
/// ```rust,ignore
/// use dialog::{EngineConfig, Machine};
///
/// let machine = Machine::spawn(VersionHandshake::default(), EngineConfig::default());
/// machine.inject_inbound(json!({"type": "version", "value": "1.2"}));
///
/// let sent = machine.observe_outbound(|m| m["kind"] == "get_version").await?;
/// assert!(machine.has_completed());
/// ```
pub struct Machine<P: Protocol> {
    shared: Arc<Shared<P>>,
    driver: tokio::task::JoinHandle<()>,
}

impl<P: Protocol> Machine<P> {
    /// Spawn a machine driving `protocol`.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(protocol: P, config: EngineConfig) -> Self {
        let (shared, restart_rx) = Shared::new(config);
        let shared = Arc::new(shared);
        tracing::info!(
            machine = %shared.id,
            name = shared.config.name.as_deref().unwrap_or(""),
            "machine spawned"
        );
        let driver = tokio::spawn(drive(protocol, Arc::clone(&shared), restart_rx));
        Self { shared, driver }
    }

    /// Machine ID (UUID v4).
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Engine configuration this machine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Clone of the current machine state.
    pub fn state(&self) -> MachineState<P::State> {
        self.shared.state()
    }

    /// Whether `run` has settled successfully.
    ///
    /// Pure read; stays `true` until an abort restarts the protocol.
    pub fn has_completed(&self) -> bool {
        self.shared.has_completed()
    }

    /// Feed a message as if received from the peer.
    ///
    /// Synchronous and non-blocking. With no inbound subscriber attached
    /// (no wait in flight), the message is buffered for the next one.
    pub fn inject_inbound(&self, message: P::In) {
        self.shared.publish_inbound(message);
    }

    /// Await the first outbound message matching `predicate`, using the
    /// configured default timeout.
    ///
    /// This is the peer-facing mirror of the protocol's `wait_for`; tests
    /// and integrators use it to await what the protocol sends.
    pub async fn observe_outbound<F>(&self, predicate: F) -> Result<P::Out>
    where
        F: FnMut(&P::Out) -> bool,
    {
        self.observe_outbound_timeout(predicate, self.shared.config.wait_timeout())
            .await
    }

    /// Await the first outbound message matching `predicate` within
    /// `timeout`.
    pub async fn observe_outbound_timeout<F>(&self, predicate: F, timeout: Duration) -> Result<P::Out>
    where
        F: FnMut(&P::Out) -> bool,
    {
        wait_for_match(&self.shared.outbound, &self.shared.aborts, timeout, predicate).await
    }

    /// Cancel every pending wait and restart the protocol from scratch.
    ///
    /// Synchronously clears inbound subscribers and buffers; pending waits
    /// settle with `Aborted` on the next scheduling opportunity, then the
    /// protocol's `reset` hook runs and `run` is re-invoked with the state
    /// back at `Started`.
    pub fn abort(&self) {
        self.shared.abort();
    }

    /// Subscribe to messages injected from the peer.
    pub fn subscribe_inbound(&self) -> Subscription<P::In> {
        Subscription::attach(&self.shared.inbound)
    }

    /// Subscribe to messages the protocol writes.
    pub fn subscribe_outbound(&self) -> Subscription<P::Out> {
        Subscription::attach(&self.shared.outbound)
    }

    /// Subscribe to broadcast run failures.
    pub fn subscribe_errors(&self) -> Subscription<Arc<EngineError>> {
        Subscription::attach(&self.shared.errors)
    }

    /// Subscribe to machine state transitions.
    pub fn subscribe_state_changes(&self) -> Subscription<MachineState<P::State>> {
        Subscription::attach(&self.shared.state_changes)
    }
}

impl<P: Protocol> Drop for Machine<P> {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Drive the protocol coroutine, handling completion, faults, and restarts.
async fn drive<P: Protocol>(
    mut protocol: P,
    shared: Arc<Shared<P>>,
    mut restart_rx: mpsc::UnboundedReceiver<()>,
) {
    let cx = Context::new(Arc::clone(&shared));
    let mut restarting = false;

    loop {
        if restarting {
            // Any abort that already got us here queued a restart request
            // of its own; consume those so they cannot trigger a second,
            // spurious restart after a later completion.
            while restart_rx.try_recv().is_ok() {}

            if let Err(e) = protocol.reset(&cx).await {
                tracing::warn!(machine = %shared.id, error = %e, "reset hook failed");
            }
            shared.set_state(MachineState::Started);
        }
        restarting = true;

        match protocol.run(&cx).await {
            Ok(()) => {
                shared.set_state(MachineState::Completed);
                tracing::info!(machine = %shared.id, "protocol run completed");
                if restart_rx.recv().await.is_none() {
                    break;
                }
            }
            // Expected artifact of a caller-triggered abort, not a fault.
            // The abort that rejected the wait also queued a restart
            // request, so for a genuine abort this resumes immediately; a
            // run that fabricates `Aborted` on its own parks like any
            // other settled run.
            Err(e) if e.is_aborted() => {
                tracing::debug!(machine = %shared.id, "protocol run aborted");
                if restart_rx.recv().await.is_none() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(machine = %shared.id, error = %e, "protocol run failed");
                shared.publish_error(Arc::new(e));
                if restart_rx.recv().await.is_none() {
                    break;
                }
            }
        }
    }
}
