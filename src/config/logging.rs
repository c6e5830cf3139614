//! Operational logging initialization.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AuditError, AuditResult};

use super::settings::LoggingConfig;

/// Initialize the tracing subscriber from the logging configuration.
///
/// `RUST_LOG` overrides the configured level when set. Fails when a
/// subscriber has already been installed.
pub fn init_logging(config: &LoggingConfig) -> AuditResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .try_init(),
    };

    result.map_err(|e| AuditError::Config {
        message: format!("Failed to initialize logging: {}", e),
    })
}
