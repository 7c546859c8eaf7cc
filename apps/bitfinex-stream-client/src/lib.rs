#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Bitfinex Stream Client - Reconnection-Resilient Market Data Feed
//!
//! Maintains a single WebSocket connection to the public Bitfinex v2
//! stream, keeps a declarative set of channel subscriptions alive across
//! reconnects and server-side renegotiations, and routes every decoded
//! message to a registered consumer.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core types with no external integrations
//!   - `streaming`: Decoded stream message types (the tagged union)
//!   - `subscription`: Subscription requests and the replay registry
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: The transport send primitive the coordinator drives
//!   - `services`: Subscription replay coordination, message routing
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `bitfinex`: WebSocket session, wire codec, reconnect, watchdog
//!   - `config`: Environment-driven settings
//!   - `shutdown`: Signal handling and the shutdown latch
//!   - `telemetry`: Tracing subscriber setup
//!
//! # Data Flow
//!
//! ```text
//! Bitfinex WS ──► Session ──► Codec ──► Router ──► Consumers
//!                    │
//!                    └─ lifecycle/info ──► Coordinator ──► Registry replay
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core streaming types with no external integrations.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::streaming::StreamMessage;
pub use domain::subscription::{
    BookLength, Precision, SubscriptionRegistry, SubscriptionRequest, Timeframe,
};

// Application services and ports
pub use application::ports::{Transport, TransportError};
pub use application::services::{
    Consumer, ConsumerError, Consumers, MessageRouter, ReplaySummary, ResubscribeTrigger,
    SubscriptionCoordinator,
};

// Session (for integration tests)
pub use infrastructure::bitfinex::{
    BitfinexClient, BitfinexClientConfig, ClientError, ClientEvent, ClientHandle, ConnectionEvent,
};

// Infrastructure config
pub use infrastructure::config::{ClientSettings, LogSettings, WebSocketSettings};

// Shutdown
pub use infrastructure::shutdown::{
    ShutdownCoordinator, ShutdownSource, ShutdownStage, install_signal_listeners,
};

// Telemetry
pub use infrastructure::telemetry::{TelemetryGuard, init as init_telemetry};
