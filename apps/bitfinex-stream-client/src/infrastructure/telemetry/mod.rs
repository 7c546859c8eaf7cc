//! Tracing Setup
//!
//! Structured logging to the console, plus an optional daily-rolling
//! file when a log directory is configured. File output goes through a
//! non-blocking writer; the returned guard must stay alive until exit
//! or buffered lines are lost.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: standard `EnvFilter` directives
//! - `BFX_LOG_DIR`: directory for rolling log files (unset = console only)
//! - `BFX_LOG_FILE_PREFIX`: log file name prefix
//!
//! # Usage
//!
//! ```ignore
//! use bitfinex_stream_client::infrastructure::{config::LogSettings, telemetry};
//!
//! let _guard = telemetry::init(&LogSettings::default());
//! tracing::info!("started");
//! ```

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::infrastructure::config::LogSettings;

/// Keeps the non-blocking file writer alive; drop flushes it.
pub struct TelemetryGuard {
    _file_writer: Option<WorkerGuard>,
}

/// Initialize the tracing subscriber.
///
/// Returns a guard that must be kept alive for the duration of the
/// program.
#[must_use]
#[allow(clippy::expect_used)]
pub fn init(log: &LogSettings) -> TelemetryGuard {
    let env_filter = EnvFilter::from_default_env()
        .add_directive(
            "bitfinex_stream_client=info"
                .parse()
                .expect("static directive 'bitfinex_stream_client=info' is valid"),
        )
        .add_directive(
            "tungstenite=warn"
                .parse()
                .expect("static directive 'tungstenite=warn' is valid"),
        );

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let Some(directory) = log.directory.as_deref() else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        return TelemetryGuard { _file_writer: None };
    };

    let file_appender = tracing_appender::rolling::daily(directory, &log.file_prefix);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    TelemetryGuard {
        _file_writer: Some(guard),
    }
}
