//! Shutdown Coordination
//!
//! Collapses every way the process can be asked to stop (Ctrl-C,
//! SIGTERM, SIGHUP) into a single idempotent latch. The first request
//! wins, records its source, and cancels the shared token; later
//! requests from other sources are logged and ignored. The main task
//! blocks on [`ShutdownCoordinator::wait`] and marks the coordinator
//! stopped once teardown is complete.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

/// Which hook requested the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSource {
    /// SIGTERM, the orchestrator asking the process to exit.
    ProcessExit,
    /// SIGHUP, the controlling terminal or supervisor going away.
    RuntimeUnload,
    /// Ctrl-C in an interactive session.
    Interrupt,
}

impl ShutdownSource {
    /// Stable name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProcessExit => "process-exit",
            Self::RuntimeUnload => "runtime-unload",
            Self::Interrupt => "interrupt",
        }
    }
}

/// Lifecycle stage of the shutdown latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStage {
    /// No shutdown requested yet.
    Running,
    /// A source fired; teardown is in progress.
    ShuttingDown,
    /// Teardown finished.
    Stopped,
}

const STAGE_RUNNING: u8 = 0;
const STAGE_SHUTTING_DOWN: u8 = 1;
const STAGE_STOPPED: u8 = 2;

/// Idempotent shutdown latch shared across tasks.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    stage: AtomicU8,
    source: RwLock<Option<ShutdownSource>>,
    cancel: CancellationToken,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    /// Coordinator in the running stage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: AtomicU8::new(STAGE_RUNNING),
            source: RwLock::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// The token cancelled when shutdown begins.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request shutdown from one source.
    ///
    /// Returns `true` for the request that actually started teardown;
    /// every later call is a no-op.
    pub fn fire(&self, source: ShutdownSource) -> bool {
        let first = self
            .stage
            .compare_exchange(
                STAGE_RUNNING,
                STAGE_SHUTTING_DOWN,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();

        if first {
            *self.source.write() = Some(source);
            tracing::info!(source = source.as_str(), "shutdown requested");
            self.cancel.cancel();
        } else {
            tracing::debug!(source = source.as_str(), "redundant shutdown request ignored");
        }
        first
    }

    /// Block until some source fires.
    pub async fn wait(&self) {
        self.cancel.cancelled().await;
    }

    /// Record that teardown finished.
    pub fn mark_stopped(&self) {
        self.stage.store(STAGE_STOPPED, Ordering::SeqCst);
        tracing::info!("shutdown complete");
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> ShutdownStage {
        match self.stage.load(Ordering::SeqCst) {
            STAGE_RUNNING => ShutdownStage::Running,
            STAGE_SHUTTING_DOWN => ShutdownStage::ShuttingDown,
            _ => ShutdownStage::Stopped,
        }
    }

    /// The source that started teardown, once one has.
    #[must_use]
    pub fn source(&self) -> Option<ShutdownSource> {
        *self.source.read()
    }
}

/// Spawn the signal listeners feeding the coordinator.
///
/// Each listener maps its signal to a [`ShutdownSource`] and fires the
/// latch; only the first one through has any effect.
pub fn install_signal_listeners(coordinator: &Arc<ShutdownCoordinator>) {
    let on_interrupt = Arc::clone(coordinator);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.fire(ShutdownSource::Interrupt);
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let on_terminate = Arc::clone(coordinator);
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    on_terminate.fire(ShutdownSource::ProcessExit);
                }
                Err(e) => tracing::warn!(error = %e, "failed to install SIGTERM handler"),
            }
        });

        let on_hangup = Arc::clone(coordinator);
        tokio::spawn(async move {
            match signal(SignalKind::hangup()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    on_hangup.fire(ShutdownSource::RuntimeUnload);
                }
                Err(e) => tracing::warn!(error = %e, "failed to install SIGHUP handler"),
            }
        });
    }
}
