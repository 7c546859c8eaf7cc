//! Connection Health Watchdog
//!
//! Bitfinex pushes an `hb` frame on every quiet channel, so a healthy
//! connection is never silent for long. The watchdog tracks the time of
//! the last inbound frame (any frame counts, data or heartbeat) and
//! declares the connection stale when that silence exceeds the
//! configured window, at which point the session tears the socket down
//! and lets the reconnect loop take over.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Watchdog timing parameters.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// How often the silence window is checked.
    pub check_interval: Duration,
    /// Inbound silence tolerated before the connection is declared stale.
    pub stale_after: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            stale_after: Duration::from_secs(30),
        }
    }
}

/// Events emitted by the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// No inbound frame within the stale window; reconnect.
    Stale {
        /// Seconds of observed silence when the verdict was reached.
        silent_for_secs: u64,
    },
}

/// Inbound activity record shared between the read loop and the watchdog.
#[derive(Debug)]
pub struct StreamActivity {
    last_frame: RwLock<Instant>,
}

impl Default for StreamActivity {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamActivity {
    /// Activity record starting from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_frame: RwLock::new(Instant::now()),
        }
    }

    /// Record an inbound frame.
    pub fn record_frame(&self) {
        *self.last_frame.write() = Instant::now();
    }

    /// Time since the last inbound frame.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_frame.read().elapsed()
    }

    /// Restart the clock for a new connection.
    pub fn reset(&self) {
        *self.last_frame.write() = Instant::now();
    }
}

/// Periodically inspects [`StreamActivity`] and reports staleness.
pub struct ConnectionWatchdog {
    config: WatchdogConfig,
    activity: Arc<StreamActivity>,
    event_tx: mpsc::Sender<WatchdogEvent>,
    cancel: CancellationToken,
}

impl ConnectionWatchdog {
    /// Watchdog over a shared activity record.
    #[must_use]
    pub const fn new(
        config: WatchdogConfig,
        activity: Arc<StreamActivity>,
        event_tx: mpsc::Sender<WatchdogEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            activity,
            event_tx,
            cancel,
        }
    }

    /// Run until cancelled or until a stale verdict is delivered.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.check_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("watchdog cancelled");
                    break;
                }
                _ = interval.tick() => {
                    let idle = self.activity.idle_for();
                    if idle > self.config.stale_after {
                        tracing::warn!(
                            idle_secs = idle.as_secs(),
                            stale_after_secs = self.config.stale_after.as_secs(),
                            "connection stale, no inbound frames"
                        );
                        let _ = self
                            .event_tx
                            .send(WatchdogEvent::Stale {
                                silent_for_secs: idle.as_secs(),
                            })
                            .await;
                        break;
                    }
                }
            }
        }
    }
}
