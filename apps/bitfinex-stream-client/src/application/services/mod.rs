//! Coordination Services
//!
//! - `coordinator`: replays the subscription registry after every
//!   reconnect or server-side renegotiation request.
//! - `router`: dispatches decoded stream messages to per-tag consumers.

pub mod coordinator;
pub mod router;

pub use coordinator::{ReplaySummary, ResubscribeTrigger, SubscriptionCoordinator};
pub use router::{Consumer, ConsumerError, Consumers, MessageRouter};
