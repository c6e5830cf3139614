//! Audit device interface and the shared redact-then-encode pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AuditError, AuditResult};
use crate::http::{HttpExchange, HttpRequest, TeeResponseWriter};
use crate::protocol::{Auth, Request, Response};

use super::format::JsonFormatter;
use super::hash::Redactor;

/// An audit device: receives auditable events and emits them durably.
///
/// Implementations must be safe for concurrent invocation; the broker
/// holds its read lock across the whole fan-out, so a device must never
/// call back into the broker's registry.
pub trait Sink: Send + Sync {
    /// Log an inbound logical request.
    fn log_request(&self, auth: Option<&Auth>, req: &Request) -> AuditResult<()>;

    /// Log a completed logical operation.
    fn log_response(
        &self,
        auth: Option<&Auth>,
        req: &Request,
        resp: Option<&Response>,
        err: Option<&str>,
    ) -> AuditResult<()>;

    /// Log a completed HTTP exchange.
    fn log_http_request(&self, req: &HttpRequest, resp: &TeeResponseWriter) -> AuditResult<()>;
}

/// Constructor for a device, given its mount options.
pub type SinkFactory =
    Arc<dyn Fn(&HashMap<String, String>) -> AuditResult<Arc<dyn Sink>> + Send + Sync>;

/// Options every device honors.
///
/// Exactly one of the two worlds is active per device: with `log_http`
/// set, the request/response calls are silent no-ops and only HTTP
/// entries are emitted; without it, the reverse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkOptions {
    /// Skip redaction and log values in the clear.
    pub log_raw: bool,

    /// Emit HTTP entries instead of request/response entries.
    pub log_http: bool,
}

impl SinkOptions {
    /// Parse the shared flags from a mount's option map. Both default to
    /// false; a malformed boolean rejects the mount.
    pub fn from_options(options: &HashMap<String, String>) -> AuditResult<Self> {
        Ok(Self {
            log_raw: parse_flag(options, "log_raw")?,
            log_http: parse_flag(options, "log_http")?,
        })
    }
}

fn parse_flag(options: &HashMap<String, String>, key: &str) -> AuditResult<bool> {
    match options.get(key) {
        None => Ok(false),
        Some(raw) => raw.parse::<bool>().map_err(|_| AuditError::Config {
            message: format!("invalid boolean for '{}': {}", key, raw),
        }),
    }
}

/// Encode a request entry, redacting a clone unless `log_raw`.
pub(crate) fn render_request(
    options: SinkOptions,
    redactor: &Redactor,
    auth: Option<&Auth>,
    req: &Request,
) -> AuditResult<Vec<u8>> {
    let mut buf = Vec::new();
    if options.log_raw {
        JsonFormatter.format_request(&mut buf, auth, req)?;
    } else {
        let auth = auth.map(|a| redactor.redact_auth(a));
        let req = redactor.redact_request(req)?;
        JsonFormatter.format_request(&mut buf, auth.as_ref(), &req)?;
    }
    Ok(buf)
}

/// Encode a response entry, redacting clones unless `log_raw`.
pub(crate) fn render_response(
    options: SinkOptions,
    redactor: &Redactor,
    auth: Option<&Auth>,
    req: &Request,
    resp: Option<&Response>,
    err: Option<&str>,
) -> AuditResult<Vec<u8>> {
    let mut buf = Vec::new();
    if options.log_raw {
        JsonFormatter.format_response(&mut buf, auth, req, resp, err)?;
    } else {
        let auth = auth.map(|a| redactor.redact_auth(a));
        let req = redactor.redact_request(req)?;
        let resp = match resp {
            Some(resp) => Some(redactor.redact_response(resp)?),
            None => None,
        };
        JsonFormatter.format_response(&mut buf, auth.as_ref(), &req, resp.as_ref(), err)?;
    }
    Ok(buf)
}

/// Snapshot and encode an HTTP entry, redacting unless `log_raw`.
pub(crate) fn render_http(
    options: SinkOptions,
    redactor: &Redactor,
    req: &HttpRequest,
    resp: &TeeResponseWriter,
) -> AuditResult<Vec<u8>> {
    let mut exchange = HttpExchange::capture(req, resp);
    if !options.log_raw {
        exchange = redactor.redact_exchange(&exchange);
    }
    let mut buf = Vec::new();
    JsonFormatter.format_http(&mut buf, &exchange)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::protocol::Operation;

    fn options_with(key: &str, value: &str) -> HashMap<String, String> {
        HashMap::from([(key.to_string(), value.to_string())])
    }

    #[test]
    fn test_options_default_to_false() {
        let options = SinkOptions::from_options(&HashMap::new()).unwrap();
        assert!(!options.log_raw);
        assert!(!options.log_http);
    }

    #[test]
    fn test_options_parse_flags() {
        let options = SinkOptions::from_options(&options_with("log_raw", "true")).unwrap();
        assert!(options.log_raw);

        let options = SinkOptions::from_options(&options_with("log_http", "true")).unwrap();
        assert!(options.log_http);
    }

    #[test]
    fn test_malformed_flag_is_rejected() {
        let err = SinkOptions::from_options(&options_with("log_raw", "yes")).unwrap_err();
        assert!(matches!(err, AuditError::Config { .. }));
    }

    #[test]
    fn test_render_request_redacts_by_default() {
        let redactor = Redactor::default();
        let mut req = Request::new(Operation::Write, "secret/foo");
        req.data = json!({"password": "abcd"}).as_object().cloned().unwrap();

        let buf = render_request(SinkOptions::default(), &redactor, None, &req).unwrap();
        let entry: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(
            entry["request"]["data"]["password"],
            "sha1:81fe8bfe87576c3ecb22426f8e57847382917acf"
        );

        // The caller's request is untouched.
        assert_eq!(req.data["password"], "abcd");
    }

    #[test]
    fn test_render_request_raw_skips_redaction() {
        let redactor = Redactor::default();
        let mut req = Request::new(Operation::Write, "secret/foo");
        req.data = json!({"password": "abcd"}).as_object().cloned().unwrap();

        let options = SinkOptions {
            log_raw: true,
            log_http: false,
        };
        let buf = render_request(options, &redactor, None, &req).unwrap();
        let entry: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(entry["request"]["data"]["password"], "abcd");
    }

    #[test]
    fn test_render_response_carries_error() {
        let redactor = Redactor::default();
        let req = Request::new(Operation::Delete, "secret/foo");

        let buf = render_response(
            SinkOptions::default(),
            &redactor,
            None,
            &req,
            None,
            Some("permission denied"),
        )
        .unwrap();
        let entry: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(entry["type"], "response");
        assert_eq!(entry["error"], "permission denied");
    }
}
