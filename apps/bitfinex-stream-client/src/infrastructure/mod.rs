//! Infrastructure Layer
//!
//! Adapters between the application core and the outside world:
//!
//! - `bitfinex`: the WebSocket session, wire codec and reconnect plumbing
//! - `config`: environment-driven settings
//! - `shutdown`: signal handling and the shutdown latch
//! - `telemetry`: tracing subscriber setup

pub mod bitfinex;
pub mod config;
pub mod shutdown;
pub mod telemetry;
