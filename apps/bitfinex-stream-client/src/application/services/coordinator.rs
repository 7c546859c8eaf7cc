//! Subscription Coordinator
//!
//! Guarantees that after every (re)establishment of the session, every
//! request in the registry has been sent exactly once per
//! establishment, in registry order.
//!
//! Two trigger origins collapse into one [`ResubscribeTrigger`]: a
//! transport-level reconnect, and a decoded protocol info message (the
//! server can request renegotiation without dropping the socket).
//! Replays are serialized by an async mutex so concurrent triggers
//! queue instead of interleaving their sends; redundant back-to-back
//! replays are tolerated because subscribing is idempotent server-side.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::application::ports::Transport;
use crate::domain::subscription::SubscriptionRegistry;

/// Why a full replay is being triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResubscribeTrigger {
    /// The session was (re)established at the transport level.
    Reconnect {
        /// Human-readable cause, e.g. "initial connect" or the error
        /// that tore the previous connection down.
        cause: String,
    },
    /// The server sent a protocol info message.
    ProtocolInfo {
        /// Protocol version from the handshake, 0 when absent.
        version: u32,
    },
}

impl fmt::Display for ResubscribeTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reconnect { cause } => write!(f, "reconnect ({cause})"),
            Self::ProtocolInfo { version } => write!(f, "protocol info (v{version})"),
        }
    }
}

/// Outcome of one replay pass, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    /// Requests sent successfully.
    pub sent: usize,
    /// Requests whose send failed (logged and skipped).
    pub failed: usize,
}

/// Replays the full subscription registry on every trigger.
pub struct SubscriptionCoordinator {
    registry: Arc<SubscriptionRegistry>,
    transport: Arc<dyn Transport>,
    // Serializes replays: concurrent triggers queue here so the sends
    // of one replay are never split across another.
    replay_gate: Mutex<()>,
}

impl SubscriptionCoordinator {
    /// Create a coordinator over a read-only registry and a transport.
    #[must_use]
    pub fn new(registry: Arc<SubscriptionRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            replay_gate: Mutex::new(()),
        }
    }

    /// Replay the entire registry, in stored order.
    ///
    /// A send failure for one entry does not block the remaining
    /// entries; there is no rollback of entries already sent. Errors
    /// are never fatal here: the session declares the connection dead
    /// on its own and the next lifecycle event re-triggers replay.
    pub async fn handle_trigger(&self, trigger: ResubscribeTrigger) -> ReplaySummary {
        let _replaying = self.replay_gate.lock().await;

        tracing::info!(
            trigger = %trigger,
            subscriptions = self.registry.len(),
            "replaying subscription set"
        );

        if let Err(e) = self.transport.ping().await {
            tracing::warn!(error = %e, "ping before replay failed");
        }

        let mut summary = ReplaySummary::default();

        for request in self.registry.all() {
            match self.transport.send(request.clone()).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        channel = request.channel(),
                        key = request.key(),
                        error = %e,
                        "subscription send failed, continuing replay"
                    );
                }
            }
        }

        tracing::debug!(
            sent = summary.sent,
            failed = summary.failed,
            "replay finished"
        );

        summary
    }
}
