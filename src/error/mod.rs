//! Error types for the audit subsystem.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
