//! Port Interfaces
//!
//! Contracts the infrastructure adapters implement. The only driven
//! port in this client is the transport session's send primitive; the
//! coordinator depends on it instead of the concrete WebSocket client,
//! which keeps replay logic testable without a live connection.

use async_trait::async_trait;

use crate::domain::subscription::SubscriptionRequest;

/// Errors surfaced by the transport send primitive.
///
/// All of these are non-fatal to the coordinator: the session's own
/// reconnect machinery declares the connection dead and produces the
/// next resubscribe trigger.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The session is gone (outbound channel closed).
    #[error("transport session closed")]
    Closed,

    /// The request could not be serialized to its wire form.
    #[error("request serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Send primitive of the transport session.
///
/// Implemented by the WebSocket client handle; mocked in coordinator
/// tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one subscription request over the session.
    async fn send(&self, request: SubscriptionRequest) -> Result<(), TransportError>;

    /// Send a ping with a fresh correlation id.
    async fn ping(&self) -> Result<(), TransportError>;
}
