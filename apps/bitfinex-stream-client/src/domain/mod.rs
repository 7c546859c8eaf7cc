//! Domain Layer - Core subscription and streaming types.
//!
//! This layer contains the core domain types for the stream client
//! with no I/O dependencies. All types here are pure Rust with
//! serialization support.

/// Decoded server message types (tickers, trades, candles, books).
pub mod streaming;

/// Subscription requests and the replayable registry.
pub mod subscription;
