//! End-to-end wait and delivery semantics.
//!
//! These tests verify predicate matching, publish-order delivery,
//! early-message buffering, and timeout behavior through the public
//! machine surface.

use std::time::Duration;

use serde_json::{json, Value};

use dialog::{Context, EngineConfig, Machine, Protocol, Result};

/// Waits for the first inbound message marked `pick`, echoes it outbound,
/// then completes.
struct EchoPicked;

impl Protocol for EchoPicked {
    type In = Value;
    type Out = Value;
    type State = &'static str;

    async fn run(&mut self, cx: &Context<Self>) -> Result<()> {
        let picked = cx.wait_for(|m| m["pick"] == true).await?;
        cx.write(picked);
        Ok(())
    }
}

/// Writes a fixed burst of numbered messages, then completes.
struct Burst(usize);

impl Protocol for Burst {
    type In = Value;
    type Out = Value;
    type State = &'static str;

    async fn run(&mut self, cx: &Context<Self>) -> Result<()> {
        cx.write_all((0..self.0).map(|n| json!({"n": n})));
        Ok(())
    }
}

/// Wait for the machine to reach its terminal state.
async fn await_completion<P: Protocol>(machine: &Machine<P>) {
    let mut states = machine.subscribe_state_changes();
    tokio::time::timeout(Duration::from_secs(2), async {
        while !machine.has_completed() {
            states.recv().await;
        }
    })
    .await
    .expect("machine did not complete in time");
}

/// The wait resolves with the first message, in publish order, satisfying
/// the predicate; earlier non-matching messages are ignored.
#[tokio::test]
async fn test_wait_resolves_first_match_in_publish_order() {
    let machine = Machine::spawn(EchoPicked, EngineConfig::default());

    // All three are injected before the protocol's wait subscribes, so
    // they arrive through the early-message buffer, in order.
    machine.inject_inbound(json!({"id": 1, "pick": false}));
    machine.inject_inbound(json!({"id": 2, "pick": true}));
    machine.inject_inbound(json!({"id": 3, "pick": true}));

    let echoed = machine.observe_outbound(|_| true).await.unwrap();
    assert_eq!(echoed["id"], 2);

    await_completion(&machine).await;
}

/// Messages written before any subscriber exist are buffered and delivered
/// exactly once, in original order, to the first subscriber; a later
/// subscriber never sees them.
#[tokio::test]
async fn test_buffer_flushed_once_to_first_subscriber() {
    let machine = Machine::spawn(Burst(3), EngineConfig::default());
    await_completion(&machine).await;

    let mut first = machine.subscribe_outbound();
    for expected in 0..3 {
        let message = first.try_recv().expect("buffered message missing");
        assert_eq!(message["n"], expected);
    }
    assert!(first.try_recv().is_none());

    let mut second = machine.subscribe_outbound();
    assert!(second.try_recv().is_none());
}

/// Simultaneous subscribers each receive every published message.
#[tokio::test]
async fn test_fanout_to_simultaneous_subscribers() {
    let machine = Machine::spawn(Burst(2), EngineConfig::default());

    // Attached before the driver's first poll, so both see live traffic.
    let mut a = machine.subscribe_outbound();
    let mut b = machine.subscribe_outbound();

    for expected in 0..2 {
        let from_a = tokio::time::timeout(Duration::from_secs(1), a.recv())
            .await
            .unwrap()
            .unwrap();
        let from_b = tokio::time::timeout(Duration::from_secs(1), b.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(from_a["n"], expected);
        assert_eq!(from_b["n"], expected);
    }
}

/// A wait with no matching message within its deadline fails with Timeout.
#[tokio::test]
async fn test_observe_timeout_elapses() {
    let machine = Machine::spawn(Burst(1), EngineConfig::default());

    let err = machine
        .observe_outbound_timeout(|m| m["n"] == 99, Duration::from_millis(5))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

/// A zero timeout fails immediately, even with a matching message already
/// buffered.
#[tokio::test]
async fn test_zero_timeout_fails_immediately() {
    let machine = Machine::spawn(Burst(1), EngineConfig::default());
    await_completion(&machine).await;

    // The burst message is sitting in the outbound buffer.
    let err = machine
        .observe_outbound_timeout(|_| true, Duration::ZERO)
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    // The buffered message was left untouched for a real subscriber.
    let matched = machine
        .observe_outbound_timeout(|_| true, Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(matched["n"], 0);
}

/// The rejection does not fire when a match arrives strictly before the
/// deadline elapses.
#[tokio::test]
async fn test_match_beats_deadline() {
    let machine = Machine::spawn(EchoPicked, EngineConfig::default());

    let observe = machine.observe_outbound_timeout(|_| true, Duration::from_millis(200));
    tokio::pin!(observe);

    tokio::select! {
        _ = &mut observe => panic!("nothing written yet"),
        () = tokio::time::sleep(Duration::from_millis(10)) => {}
    }
    machine.inject_inbound(json!({"pick": true, "id": 7}));

    let echoed = observe.await.unwrap();
    assert_eq!(echoed["id"], 7);
}

/// The machine's configured default bounds waits that specify no timeout.
#[tokio::test]
async fn test_default_timeout_from_config() {
    let config = EngineConfig {
        wait_timeout_ms: 5,
        ..Default::default()
    };
    let machine = Machine::spawn(EchoPicked, config);

    // EchoPicked's wait uses the default; with nothing injected it times
    // out and the failure is broadcast.
    let mut errors = machine.subscribe_errors();
    let err = tokio::time::timeout(Duration::from_secs(1), errors.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(err.is_timeout());
    assert!(!machine.has_completed());
}
