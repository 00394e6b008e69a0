//! The operations a running protocol composes its handshake from.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::machine::{wait_for_match, MachineState, Shared};
use crate::protocol::Protocol;

/// Protocol-facing surface of one machine instance.
///
/// Handed to [`Protocol::run`] and [`Protocol::reset`] by the driver.
/// `write` and `set_state` are synchronous and never block; `wait_for` is
/// the protocol's only suspension point.
pub struct Context<P: Protocol> {
    shared: Arc<Shared<P>>,
}

impl<P: Protocol> Context<P> {
    pub(crate) fn new(shared: Arc<Shared<P>>) -> Self {
        Self { shared }
    }

    /// Machine ID (UUID v4), for correlation in logs.
    pub fn machine_id(&self) -> &str {
        &self.shared.id
    }

    /// Timeout applied to waits that do not specify their own.
    pub fn default_wait_timeout(&self) -> Duration {
        self.shared.config.wait_timeout()
    }

    /// Publish an outbound message. Non-blocking; with no subscriber
    /// attached yet the message is buffered for the first one.
    pub fn write(&self, message: P::Out) {
        self.shared.publish_outbound(message);
    }

    /// Publish several outbound messages in order.
    pub fn write_all(&self, messages: impl IntoIterator<Item = P::Out>) {
        for message in messages {
            self.shared.publish_outbound(message);
        }
    }

    /// Suspend until the first inbound message matching `predicate`,
    /// bounded by the configured default timeout.
    ///
    /// Resolves with the first matching message in publish order; earlier
    /// non-matching messages are ignored. Fails with `Timeout` when the
    /// deadline elapses first, or `Aborted` when preempted by
    /// [`Machine::abort`](crate::Machine::abort).
    pub async fn wait_for<F>(&self, predicate: F) -> Result<P::In>
    where
        F: FnMut(&P::In) -> bool,
    {
        self.wait_for_timeout(predicate, self.shared.config.wait_timeout())
            .await
    }

    /// Suspend until the first inbound message matching `predicate`,
    /// bounded by `timeout`. A zero timeout fails immediately.
    pub async fn wait_for_timeout<F>(&self, predicate: F, timeout: Duration) -> Result<P::In>
    where
        F: FnMut(&P::In) -> bool,
    {
        wait_for_match(&self.shared.inbound, &self.shared.aborts, timeout, predicate).await
    }

    /// Record protocol progress observable via the state-change
    /// subscription.
    pub fn set_state(&self, state: P::State) {
        self.shared.set_state(MachineState::Phase(state));
    }

    /// Clone of the current machine state.
    pub fn state(&self) -> MachineState<P::State> {
        self.shared.state()
    }
}
