//! Configuration for the audit subsystem.

mod logging;
mod settings;

pub use logging::init_logging;
pub use settings::{DeviceConfig, LoggingConfig, Settings};
