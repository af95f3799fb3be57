//! Core application support for Droplets: configuration and logging setup.

pub mod config;
pub mod error;

pub use config::{Config, GeocoderConfig, ValidationResult, WeatherConfig};
pub use error::ConfigError;

use anyhow::Result;

/// Initialize logging for the application.
///
/// Call once at startup; library code only emits `tracing` events and
/// never installs a subscriber itself.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::debug!("Droplets core initialized");
    Ok(())
}
