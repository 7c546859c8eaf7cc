//! Bitfinex Stream Client Binary
//!
//! Connects to the public Bitfinex v2 WebSocket stream, keeps a demo
//! subscription set alive across reconnects, and logs every decoded
//! message.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin bitfinex-stream-client
//! ```
//!
//! # Environment Variables
//!
//! All optional:
//! - `BFX_STREAM_URL`: Stream endpoint (default: wss://api-pub.bitfinex.com/ws/2)
//! - `BFX_RECONNECT_DELAY_INITIAL_MS`: Initial reconnect delay (default: 1000)
//! - `BFX_RECONNECT_DELAY_MAX_SECS`: Maximum reconnect delay (default: 60)
//! - `BFX_RECONNECT_DELAY_GROWTH`: Backoff growth factor (default: 2.0)
//! - `BFX_MAX_RECONNECT_ATTEMPTS`: Attempt cap, 0 = unlimited (default: 0)
//! - `BFX_WATCHDOG_CHECK_INTERVAL_SECS`: Watchdog check interval (default: 5)
//! - `BFX_WATCHDOG_STALE_AFTER_SECS`: Stale verdict threshold (default: 30)
//! - `BFX_LOG_DIR`: Directory for daily rolling log files (unset = console only)
//! - `BFX_LOG_FILE_PREFIX`: Log file name prefix (default: bitfinex-stream-client)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use tokio::sync::mpsc;

use bitfinex_stream_client::infrastructure::telemetry;
use bitfinex_stream_client::{
    BookLength, ClientEvent, ClientSettings, Consumer, Consumers, MessageRouter, Precision,
    ResubscribeTrigger, ShutdownCoordinator, ShutdownSource, StreamMessage, SubscriptionCoordinator,
    SubscriptionRegistry, SubscriptionRequest, Timeframe, install_signal_listeners,
};

#[tokio::main]
#[allow(clippy::expect_used)]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    load_dotenv();

    let settings = ClientSettings::from_env();
    let _telemetry_guard = telemetry::init(&settings.log);

    tracing::info!("starting Bitfinex stream client");
    log_config(&settings);

    let shutdown = Arc::new(ShutdownCoordinator::new());
    install_signal_listeners(&shutdown);

    let registry = Arc::new(demo_subscriptions());
    tracing::info!(subscriptions = registry.len(), "subscription set registered");

    let (event_tx, event_rx) = mpsc::channel::<ClientEvent>(1024);
    let (client, handle) = bitfinex_stream_client::BitfinexClient::new(
        settings.websocket.client_config(),
        event_tx,
        shutdown.cancel_token(),
    );

    let coordinator = Arc::new(SubscriptionCoordinator::new(registry, Arc::new(handle)));
    let router = MessageRouter::new(logging_consumers());

    let client_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if let Err(e) = client.run().await {
            tracing::error!(error = %e, "stream client failed");
            client_shutdown.fire(ShutdownSource::ProcessExit);
        }
    });

    tokio::spawn(handle_client_events(event_rx, coordinator, router));

    tracing::info!("stream client ready");

    shutdown.wait().await;
    shutdown.mark_stopped();

    tracing::info!("stream client stopped");
}

/// The demo subscription set kept alive for the process lifetime.
fn demo_subscriptions() -> SubscriptionRegistry {
    let mut registry = SubscriptionRegistry::new();
    registry.add(SubscriptionRequest::ticker("BTC/USD"));
    registry.add(SubscriptionRequest::ticker("ETH/USD"));
    registry.add(SubscriptionRequest::trades("BTC/USD"));
    registry.add(SubscriptionRequest::trades("NEC/ETH"));
    registry.add(SubscriptionRequest::funding("BTC"));
    registry.add(SubscriptionRequest::funding("USD"));
    registry.add(SubscriptionRequest::candles("BTC/USD", Timeframe::OneMinute));
    registry.add(SubscriptionRequest::candles("ETH/USD", Timeframe::OneMinute));
    registry.add(SubscriptionRequest::order_book("BTC/USD", Precision::P0));
    registry.add(SubscriptionRequest::order_book("BTC/USD", Precision::P3));
    registry.add(SubscriptionRequest::order_book("ETH/USD", Precision::P0));
    registry.add(SubscriptionRequest::order_book("fUSD", Precision::P0));
    registry.add(SubscriptionRequest::raw_order_book(
        "BTCUSD",
        BookLength::OneHundred,
    ));
    registry.add(SubscriptionRequest::raw_order_book(
        "fUSD",
        BookLength::TwentyFive,
    ));
    registry.add(SubscriptionRequest::raw_order_book(
        "fBTC",
        BookLength::TwentyFive,
    ));
    registry.add(SubscriptionRequest::status("liq:global"));
    registry.add(SubscriptionRequest::status("deriv:tBTCF0:USTF0"));
    registry
}

/// Drive the coordinator and router from session events.
///
/// Lifecycle transitions that imply a replay go to the coordinator, as
/// does every protocol info message (the server's way of requesting a
/// renegotiation without dropping the socket). Everything decoded is
/// then dispatched to its consumer.
async fn handle_client_events(
    mut rx: mpsc::Receiver<ClientEvent>,
    coordinator: Arc<SubscriptionCoordinator>,
    router: MessageRouter,
) {
    while let Some(event) = rx.recv().await {
        match event {
            ClientEvent::Lifecycle(lifecycle) => {
                if let Some(trigger) = lifecycle.resubscribe_trigger() {
                    coordinator.handle_trigger(trigger).await;
                }
            }
            ClientEvent::Message(message) => {
                if let StreamMessage::Info(info) = &message {
                    coordinator
                        .handle_trigger(ResubscribeTrigger::ProtocolInfo {
                            version: info.version.unwrap_or(0),
                        })
                        .await;
                }
                router.dispatch(message);
            }
        }
    }
}

/// Consumer set that logs every message kind.
fn logging_consumers() -> Consumers {
    fn info_slot<T: std::fmt::Debug + 'static>(tag: &'static str) -> Consumer<T> {
        Box::new(move |message| {
            tracing::info!(tag, message = ?message, "stream message");
            Ok(())
        })
    }

    fn debug_slot<T: std::fmt::Debug + 'static>(tag: &'static str) -> Consumer<T> {
        Box::new(move |message| {
            tracing::debug!(tag, message = ?message, "stream message");
            Ok(())
        })
    }

    Consumers {
        on_ticker: Box::new(|t| {
            tracing::info!(symbol = %t.symbol, last = %t.last_price, bid = %t.bid, ask = %t.ask, "ticker");
            Ok(())
        }),
        on_trades: Box::new(|t| {
            tracing::info!(symbol = %t.symbol, count = t.trades.len(), "trades snapshot");
            Ok(())
        }),
        on_trade: Box::new(|t| {
            tracing::info!(symbol = %t.symbol, kind = ?t.kind, price = %t.trade.price, amount = %t.trade.amount, "trade");
            Ok(())
        }),
        on_funding: info_slot("funding"),
        on_candles: Box::new(|c| {
            tracing::info!(key = %c.key, count = c.candles.len(), "candles");
            Ok(())
        }),
        on_book: debug_slot("book"),
        on_raw_book: debug_slot("raw_book"),
        on_checksum: debug_slot("checksum"),
        on_status: info_slot("status"),
        on_wallet: info_slot("wallet"),
        on_config_ack: info_slot("config_ack"),
        on_pong: debug_slot("pong"),
        on_info: Box::new(|i| {
            tracing::info!(version = i.version, code = i.code, msg = i.msg.as_deref(), "protocol info");
            Ok(())
        }),
        on_subscribe_ack: Box::new(|a| {
            tracing::info!(
                channel = %a.channel,
                chan_id = a.chan_id,
                symbol = a.symbol.as_deref(),
                key = a.key.as_deref(),
                "subscribed"
            );
            Ok(())
        }),
        on_heartbeat: Box::new(|h| {
            tracing::trace!(chan_id = h.chan_id, "heartbeat");
            Ok(())
        }),
        on_server_error: Box::new(|e| {
            tracing::error!(code = e.code, msg = %e.msg, "server error");
            Ok(())
        }),
        on_unknown: Box::new(|raw| {
            tracing::warn!(payload = %raw, "unrecognized frame");
            Ok(())
        }),
    }
}

/// Log the parsed configuration.
fn log_config(settings: &ClientSettings) {
    tracing::info!(
        url = %settings.websocket.url,
        reconnect_initial_ms =
            u64::try_from(settings.websocket.reconnect_delay_initial.as_millis()).unwrap_or(u64::MAX),
        reconnect_max_secs = settings.websocket.reconnect_delay_max.as_secs(),
        max_attempts = settings.websocket.max_reconnect_attempts,
        stale_after_secs = settings.websocket.watchdog_stale_after.as_secs(),
        log_dir = settings.log.directory.as_deref(),
        "configuration loaded"
    );
}

/// Load .env file from the current directory or any ancestor.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}
