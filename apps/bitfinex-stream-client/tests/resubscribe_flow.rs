//! Resubscribe flow integration tests.
//!
//! Exercises the coordinator against an in-memory transport: every
//! connection-level or protocol-level trigger must replay the full
//! registry, in order, without interleaving concurrent replays.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use bitfinex_stream_client::{
    ConnectionEvent, Precision, ResubscribeTrigger, SubscriptionCoordinator, SubscriptionRegistry,
    SubscriptionRequest, Timeframe, Transport, TransportError,
};

/// Records every request it is asked to send, optionally yielding to
/// the scheduler mid-send so interleaving bugs would surface.
struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    pings: Mutex<usize>,
    yield_on_send: bool,
    fail_keys: Vec<String>,
}

impl RecordingTransport {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            pings: Mutex::new(0),
            yield_on_send: false,
            fail_keys: Vec::new(),
        }
    }

    fn yielding() -> Self {
        Self {
            yield_on_send: true,
            ..Self::new()
        }
    }

    fn failing_on(key: &str) -> Self {
        Self {
            fail_keys: vec![key.to_string()],
            ..Self::new()
        }
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: SubscriptionRequest) -> Result<(), TransportError> {
        if self.yield_on_send {
            tokio::task::yield_now().await;
        }
        if self.fail_keys.iter().any(|k| k == request.key()) {
            return Err(TransportError::Closed);
        }
        self.sent
            .lock()
            .push(format!("{}:{}", request.channel(), request.key()));
        Ok(())
    }

    async fn ping(&self) -> Result<(), TransportError> {
        *self.pings.lock() += 1;
        Ok(())
    }
}

fn demo_registry() -> Arc<SubscriptionRegistry> {
    let mut registry = SubscriptionRegistry::new();
    registry.add(SubscriptionRequest::ticker("BTC/USD"));
    registry.add(SubscriptionRequest::trades("BTC/USD"));
    registry.add(SubscriptionRequest::candles("BTC/USD", Timeframe::OneMinute));
    registry.add(SubscriptionRequest::order_book("BTC/USD", Precision::P0));
    Arc::new(registry)
}

fn expected_replay() -> Vec<String> {
    vec![
        "ticker:BTC/USD".to_string(),
        "trades:BTC/USD".to_string(),
        "candles:BTC/USD".to_string(),
        "book:BTC/USD".to_string(),
    ]
}

#[tokio::test]
async fn every_trigger_replays_the_full_registry_in_order() {
    let transport = Arc::new(RecordingTransport::new());
    let coordinator = SubscriptionCoordinator::new(
        demo_registry(),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );

    for round in 1..=3 {
        let summary = coordinator
            .handle_trigger(ResubscribeTrigger::Reconnect {
                cause: format!("disconnect #{round}"),
            })
            .await;
        assert_eq!(summary.sent, 4);
        assert_eq!(summary.failed, 0);
    }

    let expected: Vec<String> = expected_replay()
        .into_iter()
        .cycle()
        .take(12)
        .collect();
    assert_eq!(transport.sent(), expected);
    assert_eq!(*transport.pings.lock(), 3);
}

#[tokio::test]
async fn connection_lifecycle_and_protocol_info_replay_identically() {
    let transport = Arc::new(RecordingTransport::new());
    let coordinator = Arc::new(SubscriptionCoordinator::new(
        demo_registry(),
        Arc::clone(&transport) as Arc<dyn Transport>,
    ));

    // Initial connect, then a reconnect, then a server-side
    // renegotiation request over a healthy socket.
    let lifecycle_triggers = [
        ConnectionEvent::Connected,
        ConnectionEvent::Reconnected {
            cause: "connection closed by server".to_string(),
        },
    ];
    for event in lifecycle_triggers {
        let trigger = event.resubscribe_trigger().expect("connects imply replay");
        coordinator.handle_trigger(trigger).await;
    }
    coordinator
        .handle_trigger(ResubscribeTrigger::ProtocolInfo { version: 2 })
        .await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 12);
    for chunk in sent.chunks(4) {
        assert_eq!(chunk, expected_replay().as_slice());
    }
}

#[tokio::test]
async fn disconnect_alone_triggers_no_replay() {
    let transport = Arc::new(RecordingTransport::new());
    let coordinator = SubscriptionCoordinator::new(
        demo_registry(),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );

    let disconnected = ConnectionEvent::Disconnected {
        cause: "connection stale after 31s of silence".to_string(),
    };
    if let Some(trigger) = disconnected.resubscribe_trigger() {
        coordinator.handle_trigger(trigger).await;
    }

    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn concurrent_triggers_do_not_interleave_their_sends() {
    let transport = Arc::new(RecordingTransport::yielding());
    let coordinator = Arc::new(SubscriptionCoordinator::new(
        demo_registry(),
        Arc::clone(&transport) as Arc<dyn Transport>,
    ));

    let first = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            coordinator
                .handle_trigger(ResubscribeTrigger::Reconnect {
                    cause: "network reset".to_string(),
                })
                .await
        })
    };
    let second = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            coordinator
                .handle_trigger(ResubscribeTrigger::ProtocolInfo { version: 2 })
                .await
        })
    };

    first.await.expect("first replay task should finish");
    second.await.expect("second replay task should finish");

    // Whichever replay ran first, each must be a contiguous block.
    let sent = transport.sent();
    assert_eq!(sent.len(), 8);
    for chunk in sent.chunks(4) {
        assert_eq!(chunk, expected_replay().as_slice());
    }
}

#[tokio::test]
async fn one_failed_send_does_not_abort_the_replay() {
    let transport = Arc::new(RecordingTransport::failing_on("BTC/USD"));
    let mut registry = SubscriptionRegistry::new();
    registry.add(SubscriptionRequest::ticker("BTC/USD"));
    registry.add(SubscriptionRequest::ticker("ETH/USD"));
    registry.add(SubscriptionRequest::trades("ETH/USD"));

    let coordinator = SubscriptionCoordinator::new(
        Arc::new(registry),
        Arc::clone(&transport) as Arc<dyn Transport>,
    );

    let summary = coordinator
        .handle_trigger(ResubscribeTrigger::Reconnect {
            cause: "initial connect".to_string(),
        })
        .await;

    assert_eq!(summary.sent, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        transport.sent(),
        vec!["ticker:ETH/USD".to_string(), "trades:ETH/USD".to_string()]
    );
}
