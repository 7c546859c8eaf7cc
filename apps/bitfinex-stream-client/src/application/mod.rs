//! Application Layer - Coordination services and port definitions.
//!
//! This layer wires the domain to external systems: the subscription
//! coordinator replays the registry over the transport port, and the
//! message router dispatches decoded messages to typed consumers.

/// Port interfaces for external systems (transport session).
pub mod ports;

/// Coordination services (subscription replay, message routing).
pub mod services;
