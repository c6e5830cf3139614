//! HTTP capture layer for audit logging.
//!
//! The server's HTTP front end hands every exchange to the audit broker
//! after the handler has run. This module provides the pieces that make
//! that possible without disturbing the normal response path:
//!
//! - [`TeeBody`] duplicates request-body bytes as the handler reads them.
//! - [`TeeResponseWriter`] mirrors the status, headers, and body the
//!   handler writes.
//! - [`HttpRequest`] is the server-agnostic request representation the
//!   broker middleware operates on.
//! - [`HttpExchange`] is the sanitized snapshot of a completed exchange
//!   that devices redact and encode.

mod exchange;
mod headers;
mod request;
mod tee;

pub use exchange::HttpExchange;
pub use headers::{sanitize_headers, HeaderMap};
pub use request::HttpRequest;
pub use tee::{BufferedResponseWriter, ResponseWriter, TeeBody, TeeResponseWriter};
