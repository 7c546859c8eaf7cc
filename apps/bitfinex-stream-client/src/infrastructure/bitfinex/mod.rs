//! Bitfinex WebSocket Adapters
//!
//! Everything that knows the Bitfinex v2 wire protocol lives here:
//!
//! - **requests**: outbound subscribe/ping event encoding
//! - **codec**: stateful inbound frame decoding with channel id bindings
//! - **client**: the session, its reconnect loop and transport handle
//! - **reconnect**: exponential backoff policy
//! - **heartbeat**: inbound-silence watchdog

pub mod client;
pub mod codec;
pub mod heartbeat;
pub mod reconnect;
pub mod requests;

pub use client::{
    BitfinexClient, BitfinexClientConfig, ClientError, ClientEvent, ClientHandle, ConnectionEvent,
    STREAM_URL,
};
pub use codec::{CodecError, StreamCodec};
pub use heartbeat::{ConnectionWatchdog, StreamActivity, WatchdogConfig, WatchdogEvent};
pub use reconnect::{BackoffConfig, BackoffPolicy};
pub use requests::{encode_ping, encode_subscribe};
