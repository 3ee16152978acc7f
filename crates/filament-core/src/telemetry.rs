//! Telemetry initialization
//!
//! Structured logging via tracing-subscriber. Call [`init_telemetry`] once at
//! process start; the returned guard keeps the subscriber installed.

use crate::error::{Error, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name reported in log lines
    pub service_name: String,
    /// Log level filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Whether to emit formatted output to stdout
    pub stdout_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "filament".to_string(),
            log_level: "info".to_string(),
            stdout_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration with the given service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the log level filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Disable stdout output
    pub fn without_stdout(mut self) -> Self {
        self.stdout_enabled = false;
        self
    }

    /// Create from environment variables
    ///
    /// Reads `FILAMENT_SERVICE_NAME` and `RUST_LOG`.
    pub fn from_env() -> Self {
        let service_name =
            std::env::var("FILAMENT_SERVICE_NAME").unwrap_or_else(|_| "filament".to_string());
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            service_name,
            log_level,
            stdout_enabled: true,
        }
    }
}

/// Guard that keeps telemetry installed for the process lifetime
pub struct TelemetryGuard {
    _private: (),
}

/// Initialize the tracing subscriber
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = if config.stdout_enabled {
        Some(tracing_subscriber::fmt::layer())
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Internal {
            message: format!("failed to initialize tracing subscriber: {}", e),
        })?;

    tracing::info!(service = %config.service_name, "Telemetry initialized");

    Ok(TelemetryGuard { _private: () })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "filament");
        assert_eq!(config.log_level, "info");
        assert!(config.stdout_enabled);
    }

    #[test]
    fn test_telemetry_config_builder() {
        let config = TelemetryConfig::new("bulb-service")
            .with_log_level("debug")
            .without_stdout();

        assert_eq!(config.service_name, "bulb-service");
        assert_eq!(config.log_level, "debug");
        assert!(!config.stdout_enabled);
    }
}
