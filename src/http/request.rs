//! Server-agnostic HTTP request representation.

use std::io::Read;

use super::headers::HeaderMap;
use super::tee::TeeBody;

/// An inbound HTTP request as seen by the audit middleware.
///
/// The body is wrapped in a [`TeeBody`] at construction, so whatever the
/// downstream handler reads is captured for the audit record without any
/// extra work from the front end.
#[derive(Debug)]
pub struct HttpRequest {
    /// Request method (`GET`, `PUT`, ...).
    pub method: String,

    /// Request URI, as received.
    pub uri: String,

    /// HTTP protocol major version.
    pub proto_major: u32,

    /// HTTP protocol minor version.
    pub proto_minor: u32,

    /// Peer address, typically `host:port`.
    pub remote_addr: String,

    /// Request headers.
    pub headers: HeaderMap,

    /// Request body tee.
    pub body: TeeBody,
}

impl HttpRequest {
    /// Create a request speaking HTTP/1.1, wrapping `body` in a tee.
    pub fn new(
        method: impl Into<String>,
        uri: impl Into<String>,
        remote_addr: impl Into<String>,
        headers: HeaderMap,
        body: Box<dyn Read + Send>,
    ) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            proto_major: 1,
            proto_minor: 1,
            remote_addr: remote_addr.into(),
            headers,
            body: TeeBody::new(body),
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

    /// The host portion of `remote_addr`.
    ///
    /// Returns the host from a `host:port` address, with IPv6 brackets
    /// stripped, or the empty string when the address is not of that
    /// form.
    pub fn remote_host(&self) -> String {
        remote_host(&self.remote_addr)
    }
}

fn remote_host(addr: &str) -> String {
    let Some((host, _port)) = addr.rsplit_once(':') else {
        return String::new();
    };
    if let Some(bare) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        return bare.to_string();
    }
    // A colon left in the host means the input was a bare IPv6 address
    // rather than host:port.
    if host.contains(':') {
        return String::new();
    }
    host.to_string()
}
