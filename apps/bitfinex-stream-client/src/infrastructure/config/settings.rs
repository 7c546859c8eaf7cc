//! Client Configuration Settings
//!
//! Configuration types for the stream client, loaded from environment
//! variables. The public Bitfinex stream needs no credentials, so every
//! setting has a default and configuration can never fail at startup.

use std::time::Duration;

use crate::infrastructure::bitfinex::{
    BackoffConfig, BitfinexClientConfig, STREAM_URL, WatchdogConfig,
};

/// WebSocket connection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Stream endpoint URL.
    pub url: String,
    /// Initial reconnect delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnect delay.
    pub reconnect_delay_max: Duration,
    /// Reconnect delay growth factor.
    pub reconnect_delay_growth: f64,
    /// Maximum reconnect attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
    /// How often the staleness watchdog checks inbound activity.
    pub watchdog_check_interval: Duration,
    /// Inbound silence tolerated before the connection is declared stale.
    pub watchdog_stale_after: Duration,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            url: STREAM_URL.to_string(),
            reconnect_delay_initial: Duration::from_secs(1),
            reconnect_delay_max: Duration::from_secs(60),
            reconnect_delay_growth: 2.0,
            max_reconnect_attempts: 0,
            watchdog_check_interval: Duration::from_secs(5),
            watchdog_stale_after: Duration::from_secs(30),
        }
    }
}

impl WebSocketSettings {
    /// Build the session configuration these settings describe.
    #[must_use]
    pub fn client_config(&self) -> BitfinexClientConfig {
        BitfinexClientConfig {
            url: self.url.clone(),
            backoff: BackoffConfig {
                base_delay: self.reconnect_delay_initial,
                max_delay: self.reconnect_delay_max,
                growth: self.reconnect_delay_growth,
                jitter: 0.1,
                attempt_cap: self.max_reconnect_attempts,
            },
            watchdog: WatchdogConfig {
                check_interval: self.watchdog_check_interval,
                stale_after: self.watchdog_stale_after,
            },
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Directory for rolling log files; `None` disables file output.
    pub directory: Option<String>,
    /// File name prefix for the daily rolling log.
    pub file_prefix: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: "bitfinex-stream-client".to_string(),
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
    /// Log output settings.
    pub log: LogSettings,
}

impl ClientSettings {
    /// Read configuration from `BFX_*` environment variables, falling
    /// back to defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = WebSocketSettings::default();
        let websocket = WebSocketSettings {
            url: std::env::var("BFX_STREAM_URL").unwrap_or(defaults.url),
            reconnect_delay_initial: parse_env_duration_millis(
                "BFX_RECONNECT_DELAY_INITIAL_MS",
                defaults.reconnect_delay_initial,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                "BFX_RECONNECT_DELAY_MAX_SECS",
                defaults.reconnect_delay_max,
            ),
            reconnect_delay_growth: parse_env_f64(
                "BFX_RECONNECT_DELAY_GROWTH",
                defaults.reconnect_delay_growth,
            ),
            max_reconnect_attempts: parse_env_u32(
                "BFX_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            ),
            watchdog_check_interval: parse_env_duration_secs(
                "BFX_WATCHDOG_CHECK_INTERVAL_SECS",
                defaults.watchdog_check_interval,
            ),
            watchdog_stale_after: parse_env_duration_secs(
                "BFX_WATCHDOG_STALE_AFTER_SECS",
                defaults.watchdog_stale_after,
            ),
        };

        let log_defaults = LogSettings::default();
        let log = LogSettings {
            directory: std::env::var("BFX_LOG_DIR").ok().filter(|d| !d.is_empty()),
            file_prefix: std::env::var("BFX_LOG_FILE_PREFIX").unwrap_or(log_defaults.file_prefix),
        };

        Self { websocket, log }
    }
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
