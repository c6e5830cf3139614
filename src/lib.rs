//! secretd audit subsystem
//!
//! This crate is the audit pipeline of the secretd secrets-management
//! server: it observes every authenticated request/response pair (and
//! optionally every raw HTTP exchange), redacts sensitive values, and
//! delivers a durable, structured record to one or more configured
//! audit devices.

pub mod audit;
pub mod barrier;
pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
