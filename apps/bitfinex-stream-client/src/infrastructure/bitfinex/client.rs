//! Bitfinex WebSocket Session
//!
//! Owns the connection lifecycle: connect, decode inbound frames, relay
//! outbound requests, watch for staleness, and reconnect with backoff
//! until cancelled.
//!
//! # Stream URL
//!
//! `wss://api-pub.bitfinex.com/ws/2`
//!
//! The session never interprets market data; every decoded frame is
//! forwarded as a [`ClientEvent`] and the application layer decides what
//! to do with it. The only protocol knowledge here is the session-level
//! plumbing (WebSocket ping/pong, close frames, the staleness watchdog).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::codec::StreamCodec;
use super::heartbeat::{ConnectionWatchdog, StreamActivity, WatchdogConfig, WatchdogEvent};
use super::reconnect::{BackoffConfig, BackoffPolicy};
use super::requests;
use crate::application::ports::{Transport, TransportError};
use crate::application::services::ResubscribeTrigger;
use crate::domain::streaming::StreamMessage;
use crate::domain::subscription::SubscriptionRequest;

/// Public Bitfinex v2 stream endpoint.
pub const STREAM_URL: &str = "wss://api-pub.bitfinex.com/ws/2";

const OUTBOUND_BUFFER: usize = 64;

// =============================================================================
// Error Type
// =============================================================================

/// Errors produced by the session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// WebSocket-level failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server closed the connection or the stream ended.
    #[error("connection closed by server")]
    ConnectionClosed,

    /// The watchdog saw no inbound frames within its window.
    #[error("connection stale after {silent_for_secs}s of silence")]
    Stale {
        /// Observed silence in seconds.
        silent_for_secs: u64,
    },

    /// The event consumer went away; nothing left to deliver to.
    #[error("event channel closed")]
    EventChannelClosed,

    /// The backoff policy ran out of attempts.
    #[error("reconnect attempts exhausted")]
    ReconnectExhausted,
}

// =============================================================================
// Events
// =============================================================================

/// Connection lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// First successful connection of this session.
    Connected,
    /// Connection re-established after a failure.
    Reconnected {
        /// What tore the previous connection down.
        cause: String,
    },
    /// Connection lost; the reconnect loop takes over.
    Disconnected {
        /// Why the connection was lost.
        cause: String,
    },
}

impl ConnectionEvent {
    /// The resubscribe trigger this transition implies, if any.
    ///
    /// Both connect flavors demand a replay; a disconnect does not (the
    /// replay happens once the connection is back).
    #[must_use]
    pub fn resubscribe_trigger(&self) -> Option<ResubscribeTrigger> {
        match self {
            Self::Connected => Some(ResubscribeTrigger::Reconnect {
                cause: "initial connect".to_string(),
            }),
            Self::Reconnected { cause } => Some(ResubscribeTrigger::Reconnect {
                cause: cause.clone(),
            }),
            Self::Disconnected { .. } => None,
        }
    }
}

/// Everything the session reports upward.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A lifecycle transition.
    Lifecycle(ConnectionEvent),
    /// A decoded stream message.
    Message(StreamMessage),
}

// =============================================================================
// Configuration
// =============================================================================

/// Session configuration.
#[derive(Debug, Clone)]
pub struct BitfinexClientConfig {
    /// WebSocket endpoint.
    pub url: String,
    /// Reconnect backoff parameters.
    pub backoff: BackoffConfig,
    /// Staleness watchdog parameters.
    pub watchdog: WatchdogConfig,
}

impl Default for BitfinexClientConfig {
    fn default() -> Self {
        Self {
            url: STREAM_URL.to_string(),
            backoff: BackoffConfig::default(),
            watchdog: WatchdogConfig::default(),
        }
    }
}

// =============================================================================
// Transport Handle
// =============================================================================

/// Cloneable sender half of the session, implementing [`Transport`].
///
/// Requests are serialized here and queued onto the session's outbound
/// channel; the connection loop writes them to whatever socket is
/// currently live.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    outbound: mpsc::Sender<String>,
    ping_cid: Arc<AtomicU64>,
}

impl ClientHandle {
    fn new(outbound: mpsc::Sender<String>) -> Self {
        Self {
            outbound,
            ping_cid: Arc::new(AtomicU64::new(1)),
        }
    }
}

#[async_trait]
impl Transport for ClientHandle {
    async fn send(&self, request: SubscriptionRequest) -> Result<(), TransportError> {
        let json = requests::encode_subscribe(&request)?;
        self.outbound
            .send(json)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn ping(&self) -> Result<(), TransportError> {
        let cid = self.ping_cid.fetch_add(1, Ordering::Relaxed);
        let json = requests::encode_ping(cid)?;
        self.outbound
            .send(json)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

// =============================================================================
// Client
// =============================================================================

/// The WebSocket session with its reconnect loop.
pub struct BitfinexClient {
    config: BitfinexClientConfig,
    event_tx: mpsc::Sender<ClientEvent>,
    outbound_rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
    sessions: u64,
    last_cause: String,
}

impl BitfinexClient {
    /// Create a session and the handle used to send requests into it.
    #[must_use]
    pub fn new(
        config: BitfinexClientConfig,
        event_tx: mpsc::Sender<ClientEvent>,
        cancel: CancellationToken,
    ) -> (Self, ClientHandle) {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let client = Self {
            config,
            event_tx,
            outbound_rx,
            cancel,
            sessions: 0,
            last_cause: String::new(),
        };
        (client, ClientHandle::new(outbound_tx))
    }

    /// Run the connection loop until cancelled or the backoff policy is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error only when no further reconnect is possible.
    pub async fn run(mut self) -> Result<(), ClientError> {
        let mut policy = BackoffPolicy::new(self.config.backoff.clone());

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("stream client cancelled");
                return Ok(());
            }

            match self.connect_and_run(&mut policy).await {
                Ok(()) => {
                    tracing::info!("stream session ended");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stream session failed");
                    let cause = e.to_string();
                    let _ = self
                        .event_tx
                        .send(ClientEvent::Lifecycle(ConnectionEvent::Disconnected {
                            cause: cause.clone(),
                        }))
                        .await;
                    self.last_cause = cause;

                    let Some(delay) = policy.next_delay() else {
                        return Err(ClientError::ReconnectExhausted);
                    };
                    tracing::info!(
                        attempt = policy.failures(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "reconnecting"
                    );
                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            tracing::info!("stream client cancelled during reconnect delay");
                            return Ok(());
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// One connection: connect, announce the lifecycle transition, then
    /// pump frames until something ends the session.
    async fn connect_and_run(&mut self, policy: &mut BackoffPolicy) -> Result<(), ClientError> {
        tracing::info!(url = %self.config.url, "connecting to stream");
        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.config.url).await?;
        policy.reset();

        let (mut write, mut read) = ws_stream.split();
        // Channel bindings are per-connection; a fresh codec guarantees
        // ids from the previous socket cannot resolve.
        let mut codec = StreamCodec::new();

        let activity = Arc::new(StreamActivity::new());
        let (watchdog_tx, mut watchdog_rx) = mpsc::channel(4);
        let watchdog_cancel = self.cancel.child_token();
        let watchdog = ConnectionWatchdog::new(
            self.config.watchdog.clone(),
            Arc::clone(&activity),
            watchdog_tx,
            watchdog_cancel.clone(),
        );
        let _watchdog_handle = tokio::spawn(watchdog.run());

        let lifecycle = if self.sessions == 0 {
            ConnectionEvent::Connected
        } else {
            ConnectionEvent::Reconnected {
                cause: self.last_cause.clone(),
            }
        };
        self.sessions += 1;
        let emit = self
            .event_tx
            .send(ClientEvent::Lifecycle(lifecycle))
            .await
            .map_err(|_| ClientError::EventChannelClosed);
        if let Err(e) = emit {
            watchdog_cancel.cancel();
            return Err(e);
        }

        let result = 'session: loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    break 'session Ok(());
                }
                verdict = watchdog_rx.recv() => {
                    if let Some(WatchdogEvent::Stale { silent_for_secs }) = verdict {
                        break 'session Err(ClientError::Stale { silent_for_secs });
                    }
                }
                outbound = self.outbound_rx.recv() => {
                    match outbound {
                        Some(text) => {
                            if let Err(e) = write.send(Message::Text(text.into())).await {
                                break 'session Err(e.into());
                            }
                        }
                        None => {
                            tracing::info!("request channel closed, ending session");
                            break 'session Ok(());
                        }
                    }
                }
                inbound = read.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            activity.record_frame();
                            match codec.decode(&text) {
                                Ok(messages) => {
                                    for message in messages {
                                        if self
                                            .event_tx
                                            .send(ClientEvent::Message(message))
                                            .await
                                            .is_err()
                                        {
                                            break 'session Err(ClientError::EventChannelClosed);
                                        }
                                    }
                                }
                                // A frame we cannot decode is dropped, not fatal.
                                Err(e) => tracing::warn!(error = %e, "undecodable frame dropped"),
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            activity.record_frame();
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                break 'session Err(e.into());
                            }
                        }
                        Some(Ok(Message::Pong(_))) => activity.record_frame(),
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("server sent close frame");
                            break 'session Err(ClientError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break 'session Err(e.into()),
                        None => {
                            tracing::info!("WebSocket stream ended");
                            break 'session Err(ClientError::ConnectionClosed);
                        }
                    }
                }
            }
        };

        watchdog_cancel.cancel();
        result
    }
}
