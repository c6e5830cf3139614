//! Configuration settings for the audit subsystem.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AuditError, AuditResult};

/// Audit configuration loaded from the server's TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Operational logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Audit devices to enable at startup.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Operational logging configuration.
///
/// This controls the server's own diagnostics, not the audit entries
/// themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// One audit device declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Mount path for the device.
    pub path: String,

    /// Driver name (e.g. "file", "syslog").
    #[serde(rename = "type")]
    pub device_type: String,

    /// Driver options (e.g. `path` for the file driver).
    #[serde(default)]
    pub options: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> AuditResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AuditError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| AuditError::Config {
            message: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> AuditResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(AuditError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(AuditError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        for device in &self.devices {
            if device.path.is_empty() {
                return Err(AuditError::Config {
                    message: "Audit device path must not be empty".to_string(),
                });
            }
            if device.device_type.is_empty() {
                return Err(AuditError::Config {
                    message: format!("Audit device '{}' is missing a type", device.path),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_log_format(), "pretty");
    }

    #[test]
    fn test_parse_full_config() {
        let settings: Settings = toml::from_str(
            r#"
            [logging]
            level = "debug"
            format = "json"

            [[devices]]
            path = "main"
            type = "file"
            options = { path = "/var/log/secretd/audit.log" }

            [[devices]]
            path = "sec"
            type = "syslog"
            "#,
        )
        .unwrap();
        settings.validate().unwrap();

        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.devices.len(), 2);
        assert_eq!(settings.devices[0].device_type, "file");
        assert_eq!(
            settings.devices[0].options["path"],
            "/var/log/secretd/audit.log"
        );
        assert!(settings.devices[1].options.is_empty());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let settings: Settings = toml::from_str(
            r#"
            [logging]
            level = "loud"
            "#,
        )
        .unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_device_missing_type_rejected() {
        let settings = Settings {
            logging: LoggingConfig::default(),
            devices: vec![DeviceConfig {
                path: "main".to_string(),
                device_type: String::new(),
                options: HashMap::new(),
            }],
        };
        assert!(settings.validate().is_err());
    }
}
