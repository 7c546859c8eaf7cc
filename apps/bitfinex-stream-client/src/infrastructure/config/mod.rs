//! Configuration Loading
//!
//! Environment-driven configuration with working defaults for every
//! setting. The stream is public, so there are no credentials to load.

pub mod settings;

pub use settings::{ClientSettings, LogSettings, WebSocketSettings};
