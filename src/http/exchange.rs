//! Captured HTTP exchange snapshot.

use std::time::Duration;

use super::headers::{sanitize_headers, HeaderMap};
use super::request::HttpRequest;
use super::tee::TeeResponseWriter;

/// A completed HTTP exchange, snapshotted for audit devices.
///
/// Built after the downstream handler has returned, from the request tee
/// and the response tee. Header names are already case-folded and
/// multi-values joined; the remote address is reduced to its host
/// portion. Devices redact and encode their own copy, so the snapshot is
/// plain owned data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpExchange {
    /// Request method.
    pub method: String,

    /// Request URI.
    pub uri: String,

    /// HTTP protocol major version.
    pub proto_major: u32,

    /// HTTP protocol minor version.
    pub proto_minor: u32,

    /// Host portion of the peer address, or empty.
    pub remote_address: String,

    /// Sanitized request headers.
    pub request_headers: HeaderMap,

    /// Request body bytes the handler consumed, as a string.
    pub request_body: String,

    /// Response status code.
    pub status_code: u16,

    /// Sanitized response headers, as they stood when the response
    /// started.
    pub response_headers: HeaderMap,

    /// Response body the handler wrote, as a string.
    pub response_body: String,

    /// Wall time from handler entry to handler exit.
    pub duration: Duration,
}

impl HttpExchange {
    /// Snapshot a completed exchange.
    pub fn capture(req: &HttpRequest, resp: &TeeResponseWriter) -> Self {
        Self {
            method: req.method.clone(),
            uri: req.uri.clone(),
            proto_major: req.proto_major,
            proto_minor: req.proto_minor,
            remote_address: req.remote_host(),
            request_headers: sanitize_headers(&req.headers),
            request_body: req.body.captured_string(),
            status_code: resp.status_code(),
            response_headers: sanitize_headers(resp.raw_headers()),
            response_body: resp.body_string(),
            duration: resp.duration(),
        }
    }

    /// Protocol string, e.g. `HTTP/1.1`.
    pub fn proto(&self) -> String {
        format!("HTTP/{}.{}", self.proto_major, self.proto_minor)
    }

    /// Protocol version, e.g. `1.1`.
    pub fn version(&self) -> String {
        format!("{}.{}", self.proto_major, self.proto_minor)
    }
}
