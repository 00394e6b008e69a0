//! State shared between a machine handle, its driver task, and waiters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, oneshot};

use super::state::MachineState;
use crate::channel::{lock, Channel, ChannelRef, EventKind};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::protocol::Protocol;

/// Lock a mutex, recovering from poisoning.
///
/// Critical sections here only touch registries and the state cell, so a
/// recovered guard is always consistent.
pub(crate) fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Rejection callbacks of currently-suspended waits.
///
/// Every `wait_for` registers a one-shot rejecter here for its lifetime;
/// `abort()` drains and fires them all, and a wait that settles normally
/// deregisters itself so a later abort cannot hit a stale entry.
#[derive(Default)]
pub(crate) struct AbortRegistry {
    next_id: u64,
    pending: HashMap<u64, oneshot::Sender<()>>,
}

impl AbortRegistry {
    /// Register a pending wait. Returns its handle and the signal receiver.
    pub(crate) fn register(&mut self) -> (u64, oneshot::Receiver<()>) {
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        (id, rx)
    }

    /// Remove a settled wait's entry.
    pub(crate) fn deregister(&mut self, id: u64) {
        self.pending.remove(&id);
    }

    /// Fire every pending rejecter. Returns how many were fired.
    pub(crate) fn fire_all(&mut self) -> usize {
        let fired = self.pending.len();
        for (_, tx) in self.pending.drain() {
            // A wait that settled concurrently has dropped its receiver.
            let _ = tx.send(());
        }
        fired
    }

    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Per-machine registries, channels, and state cell.
///
/// Owned exclusively by one machine instance; no cross-instance sharing.
pub(crate) struct Shared<P: Protocol> {
    /// Machine ID (UUID v4), attached to log records.
    pub(crate) id: String,
    /// Engine configuration.
    pub(crate) config: EngineConfig,
    /// Messages received from the peer.
    pub(crate) inbound: ChannelRef<P::In>,
    /// Messages the protocol writes toward the peer.
    pub(crate) outbound: ChannelRef<P::Out>,
    /// Broadcast run failures.
    pub(crate) errors: ChannelRef<Arc<EngineError>>,
    /// State transitions.
    pub(crate) state_changes: ChannelRef<MachineState<P::State>>,
    /// Current machine state.
    state: Mutex<MachineState<P::State>>,
    /// Pending-abort registry.
    pub(crate) aborts: Mutex<AbortRegistry>,
    /// Restart requests toward the driver, one per abort. The driver
    /// consumes them while parked (machine completed or run failed) and
    /// drains stale ones when a rejected wait already restarted it.
    restart_tx: mpsc::UnboundedSender<()>,
}

impl<P: Protocol> Shared<P> {
    /// Build the shared registries plus the driver's restart receiver.
    pub(crate) fn new(config: EngineConfig) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (restart_tx, restart_rx) = mpsc::unbounded_channel();
        let shared = Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            inbound: Channel::shared(EventKind::Inbound),
            outbound: Channel::shared(EventKind::Outbound),
            errors: Channel::shared(EventKind::Error),
            state_changes: Channel::shared(EventKind::StateChanged),
            state: Mutex::new(MachineState::Started),
            aborts: Mutex::new(AbortRegistry::default()),
            restart_tx,
        };
        (shared, restart_rx)
    }

    /// Clone of the current state.
    pub(crate) fn state(&self) -> MachineState<P::State> {
        guard(&self.state).clone()
    }

    /// Whether the machine is in its terminal state.
    pub(crate) fn has_completed(&self) -> bool {
        guard(&self.state).is_completed()
    }

    /// Record a state transition and publish it on the state channel.
    pub(crate) fn set_state(&self, next: MachineState<P::State>) {
        tracing::debug!(machine = %self.id, state = ?next, "state transition");
        *guard(&self.state) = next.clone();
        lock(&self.state_changes).publish(next);
    }

    /// Publish a message received from the peer.
    pub(crate) fn publish_inbound(&self, message: P::In) {
        lock(&self.inbound).publish(message);
    }

    /// Publish a message toward the peer.
    pub(crate) fn publish_outbound(&self, message: P::Out) {
        lock(&self.outbound).publish(message);
    }

    /// Broadcast a run failure to error subscribers.
    pub(crate) fn publish_error(&self, error: Arc<EngineError>) {
        lock(&self.errors).publish(error);
    }

    /// Cancel every pending wait and request a protocol restart.
    ///
    /// Synchronously clears the inbound channel (subscribers and buffer)
    /// and fires the abort registry; the interrupted waits settle with
    /// `Aborted` on their next poll. A restart request is always queued as
    /// well, covering the case where the protocol itself had no wait in
    /// flight (completed, or parked on a fault) and so nothing would
    /// otherwise wake the driver.
    pub(crate) fn abort(&self) {
        lock(&self.inbound).clear();
        // Queue the restart before firing the registry, so a driver woken
        // by its rejected wait always finds this request when draining.
        let _ = self.restart_tx.send(());
        let fired = guard(&self.aborts).fire_all();
        tracing::info!(machine = %self.id, pending_waits = fired, "abort requested");
    }
}
