//! Predicate waiter: one-shot subscription racing a deadline and an abort.

use std::sync::Mutex;
use std::time::Duration;

use super::shared::{guard, AbortRegistry};
use crate::channel::{lock, ChannelRef, Subscription};
use crate::error::{EngineError, Result};

/// Suspend until the first message on `channel` matching `predicate`.
///
/// A transient subscription is attached (flushing any buffered messages
/// ahead of live traffic), a rejecter is registered with the machine's
/// abort registry, and a deadline timer is started. The wait settles with
/// whichever comes first:
///
/// - the first delivered message for which `predicate` returns `true`
///   (earlier non-matching messages are consumed and dropped, with no
///   side effect on the waiter or the channel),
/// - `Aborted`, if the machine is aborted or the channel is cleared
///   underneath the subscription,
/// - `Timeout`, once `timeout` elapses.
///
/// A zero timeout fails immediately without reaching an await point. On
/// any settlement the rejecter is deregistered and the subscription is
/// dropped, so a timer or abort firing afterwards is a no-op.
pub(crate) async fn wait_for_match<T, F>(
    channel: &ChannelRef<T>,
    aborts: &Mutex<AbortRegistry>,
    timeout: Duration,
    mut predicate: F,
) -> Result<T>
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    let kind = lock(channel).kind();
    if timeout.is_zero() {
        return Err(EngineError::Timeout { kind, timeout });
    }

    let (abort_id, mut aborted) = guard(aborts).register();
    let mut subscription = Subscription::attach(channel);
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    tracing::trace!(%kind, ?timeout, "wait started");
    let outcome = loop {
        tokio::select! {
            biased;
            _ = &mut aborted => break Err(EngineError::Aborted),
            message = subscription.recv() => match message {
                Some(m) if predicate(&m) => break Ok(m),
                // Non-matching messages are ignored, not re-buffered.
                Some(_) => {}
                // Channel cleared underneath us: abort in progress.
                None => break Err(EngineError::Aborted),
            },
            () = &mut deadline => break Err(EngineError::Timeout { kind, timeout }),
        }
    };

    guard(aborts).deregister(abort_id);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, EventKind};

    fn fixture() -> (ChannelRef<u32>, Mutex<AbortRegistry>) {
        (
            Channel::shared(EventKind::Inbound),
            Mutex::new(AbortRegistry::default()),
        )
    }

    #[tokio::test]
    async fn test_resolves_with_first_match_from_buffer() {
        let (channel, aborts) = fixture();
        lock(&channel).publish(1);
        lock(&channel).publish(2);
        lock(&channel).publish(3);

        let matched = wait_for_match(&channel, &aborts, Duration::from_millis(100), |m| *m >= 2)
            .await
            .unwrap();
        assert_eq!(matched, 2);
        assert_eq!(guard(&aborts).pending_count(), 0);
    }

    #[tokio::test]
    async fn test_non_matching_messages_have_no_side_effect() {
        let (channel, aborts) = fixture();
        lock(&channel).publish(1);

        let result = wait_for_match(&channel, &aborts, Duration::from_millis(5), |m| *m == 9).await;
        assert!(result.unwrap_err().is_timeout());
        // The consumed non-match was not re-buffered.
        assert_eq!(lock(&channel).buffered_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_timeout_fails_without_yielding() {
        let (channel, aborts) = fixture();
        lock(&channel).publish(42);

        let result = wait_for_match(&channel, &aborts, Duration::ZERO, |_| true).await;
        assert!(result.unwrap_err().is_timeout());
        // No subscription was ever attached, so the message stayed buffered.
        assert_eq!(lock(&channel).buffered_count(), 1);
    }

    #[tokio::test]
    async fn test_abort_preempts_wait() {
        let (channel, aborts) = fixture();

        let mut wait = tokio_test::task::spawn(wait_for_match(
            &channel,
            &aborts,
            Duration::from_secs(5),
            |_| true,
        ));
        // Drive the wait to its suspension point, then fire the registry.
        tokio_test::assert_pending!(wait.poll());
        assert_eq!(guard(&aborts).fire_all(), 1);

        let result = wait.await;
        assert!(result.unwrap_err().is_aborted());
    }

    #[tokio::test]
    async fn test_channel_cleared_settles_as_aborted() {
        let (channel, aborts) = fixture();

        let mut wait = tokio_test::task::spawn(wait_for_match(
            &channel,
            &aborts,
            Duration::from_secs(5),
            |_| true,
        ));
        tokio_test::assert_pending!(wait.poll());
        lock(&channel).clear();

        let result = wait.await;
        assert!(result.unwrap_err().is_aborted());
    }

    #[tokio::test]
    async fn test_transient_subscription_removed_after_match() {
        let (channel, aborts) = fixture();
        lock(&channel).publish(7);

        wait_for_match(&channel, &aborts, Duration::from_millis(100), |_| true)
            .await
            .unwrap();
        assert_eq!(lock(&channel).subscriber_count(), 0);
    }
}
