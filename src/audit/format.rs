//! JSON encoding of audit entries.
//!
//! One compact JSON object per entry, newline-terminated. The field names
//! here are the external contract consumed by log pipelines; changing
//! them breaks downstream parsers.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AuditResult;
use crate::http::{HeaderMap, HttpExchange};
use crate::protocol::{Auth, Operation, Request, Response};

/// Stateless encoder for the three audit entry shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Write a `request` entry.
    ///
    /// A missing principal is encoded as an empty one so the schema stays
    /// stable. Request entries never carry the client token.
    pub fn format_request(
        &self,
        w: &mut dyn Write,
        auth: Option<&Auth>,
        req: &Request,
    ) -> AuditResult<()> {
        let auth = auth.cloned().unwrap_or_default();
        write_entry(
            w,
            &RequestEntry {
                entry_type: "request",
                auth: AuthEntry::for_request(&auth),
                request: RequestInfo::new(req),
            },
        )
    }

    /// Write a `response` entry.
    ///
    /// The `error` field is always present, empty when the operation
    /// succeeded. Issued auth and secret are omitted when absent.
    pub fn format_response(
        &self,
        w: &mut dyn Write,
        auth: Option<&Auth>,
        req: &Request,
        resp: Option<&Response>,
        err: Option<&str>,
    ) -> AuditResult<()> {
        let auth = auth.cloned().unwrap_or_default();
        let resp = resp.cloned().unwrap_or_default();
        write_entry(
            w,
            &ResponseEntry {
                entry_type: "response",
                error: err.unwrap_or_default().to_string(),
                auth: AuthEntry::summary(&auth),
                request: RequestInfo::new(req),
                response: ResponseInfo {
                    auth: resp.auth.as_ref().map(AuthEntry::full),
                    secret: resp.secret.as_ref().map(|s| SecretEntry {
                        lease_id: s.lease_id.clone(),
                    }),
                    data: resp.data.clone(),
                    redirect: resp.redirect.clone(),
                },
            },
        )
    }

    /// Write an `http` entry for a captured exchange.
    pub fn format_http(&self, w: &mut dyn Write, exchange: &HttpExchange) -> AuditResult<()> {
        let reason = status_text(exchange.status_code);
        write_entry(
            w,
            &HttpEntry {
                entry_type: "http",
                duration: exchange.duration.as_millis() as u64,
                http: HttpInfo {
                    request: HttpRequestInfo {
                        body: exchange.request_body.clone(),
                        headers: fold_headers(&exchange.request_headers),
                        method: exchange.method.clone(),
                        url: exchange.uri.clone(),
                        remote_address: exchange.remote_address.clone(),
                    },
                    response: HttpResponseInfo {
                        body: exchange.response_body.clone(),
                        headers: fold_headers(&exchange.response_headers),
                        reason: reason.to_string(),
                        status: exchange.status_code,
                    },
                    version: exchange.version(),
                },
                message: format!(
                    "{} {} {}\n{} {} {}",
                    exchange.method,
                    exchange.uri,
                    exchange.proto(),
                    exchange.proto(),
                    exchange.status_code,
                    reason,
                ),
            },
        )
    }
}

fn write_entry<T: Serialize>(w: &mut dyn Write, entry: &T) -> AuditResult<()> {
    serde_json::to_writer(&mut *w, entry)?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Canonical reason phrase for a status code, empty when unknown.
fn status_text(code: u16) -> &'static str {
    ::http::StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("")
}

/// Collapse a sanitized header map to single joined values.
fn fold_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, values)| (name.to_lowercase(), values.join("; ")))
        .collect()
}

#[derive(Debug, Serialize)]
struct RequestEntry {
    #[serde(rename = "type")]
    entry_type: &'static str,
    auth: AuthEntry,
    request: RequestInfo,
}

#[derive(Debug, Serialize)]
struct ResponseEntry {
    #[serde(rename = "type")]
    entry_type: &'static str,
    error: String,
    auth: AuthEntry,
    request: RequestInfo,
    response: ResponseInfo,
}

#[derive(Debug, Serialize)]
struct AuthEntry {
    #[serde(skip_serializing_if = "String::is_empty")]
    client_token: String,
    display_name: String,
    policies: Vec<String>,
    metadata: BTreeMap<String, String>,
}

impl AuthEntry {
    /// Request entries identify the principal without its token.
    fn for_request(auth: &Auth) -> Self {
        Self {
            client_token: String::new(),
            display_name: auth.display_name.clone(),
            policies: auth.policies.clone(),
            metadata: auth.metadata.clone(),
        }
    }

    /// Response entries summarize the calling principal by policies and
    /// metadata alone.
    fn summary(auth: &Auth) -> Self {
        Self {
            client_token: String::new(),
            display_name: String::new(),
            policies: auth.policies.clone(),
            metadata: auth.metadata.clone(),
        }
    }

    /// Issued principals are recorded in full.
    fn full(auth: &Auth) -> Self {
        Self {
            client_token: auth.client_token.clone(),
            display_name: auth.display_name.clone(),
            policies: auth.policies.clone(),
            metadata: auth.metadata.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestInfo {
    operation: Operation,
    path: String,
    data: Map<String, Value>,
}

impl RequestInfo {
    fn new(req: &Request) -> Self {
        Self {
            operation: req.operation,
            path: req.path.clone(),
            data: req.data.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<AuthEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<SecretEntry>,
    data: Map<String, Value>,
    redirect: String,
}

#[derive(Debug, Serialize)]
struct SecretEntry {
    lease_id: String,
}

#[derive(Debug, Serialize)]
struct HttpEntry {
    #[serde(rename = "type")]
    entry_type: &'static str,
    duration: u64,
    http: HttpInfo,
    message: String,
}

#[derive(Debug, Serialize)]
struct HttpInfo {
    request: HttpRequestInfo,
    response: HttpResponseInfo,
    version: String,
}

#[derive(Debug, Serialize)]
struct HttpRequestInfo {
    body: String,
    headers: BTreeMap<String, String>,
    method: String,
    url: String,
    remote_address: String,
}

#[derive(Debug, Serialize)]
struct HttpResponseInfo {
    body: String,
    headers: BTreeMap<String, String>,
    reason: String,
    status: u16,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    fn parse_line(buf: &[u8]) -> Value {
        let text = std::str::from_utf8(buf).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 1);
        serde_json::from_str(text.trim_end()).unwrap()
    }

    #[test]
    fn test_request_entry_envelope() {
        let auth = Auth {
            display_name: "root".to_string(),
            policies: vec!["dev".to_string(), "ops".to_string()],
            metadata: BTreeMap::from([("user".to_string(), "a".to_string())]),
            ..Auth::default()
        };
        let req = Request::new(Operation::Read, "sys/mounts");

        let mut buf = Vec::new();
        JsonFormatter
            .format_request(&mut buf, Some(&auth), &req)
            .unwrap();

        let entry = parse_line(&buf);
        let keys: Vec<&str> = entry.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&"type"));
        assert!(keys.contains(&"auth"));
        assert!(keys.contains(&"request"));

        assert_eq!(entry["type"], "request");
        assert_eq!(entry["auth"]["display_name"], "root");
        assert_eq!(entry["auth"]["policies"], json!(["dev", "ops"]));
        assert!(entry["auth"].get("client_token").is_none());
        assert_eq!(entry["request"]["operation"], "read");
        assert_eq!(entry["request"]["path"], "sys/mounts");
        assert_eq!(entry["request"]["data"], json!({}));
    }

    #[test]
    fn test_request_entry_with_nil_auth() {
        let req = Request::new(Operation::List, "secret/");
        let mut buf = Vec::new();
        JsonFormatter.format_request(&mut buf, None, &req).unwrap();

        let entry = parse_line(&buf);
        assert_eq!(entry["auth"]["display_name"], "");
        assert_eq!(entry["auth"]["policies"], json!([]));
    }

    #[test]
    fn test_response_entry_always_emits_error() {
        let req = Request::new(Operation::Write, "secret/foo");
        let mut buf = Vec::new();
        JsonFormatter
            .format_response(&mut buf, None, &req, None, None)
            .unwrap();

        let entry = parse_line(&buf);
        assert_eq!(entry["type"], "response");
        assert_eq!(entry["error"], "");
        assert!(entry["response"].get("auth").is_none());
        assert!(entry["response"].get("secret").is_none());
        assert_eq!(entry["response"]["redirect"], "");
    }

    #[test]
    fn test_response_entry_with_issued_auth_and_secret() {
        let req = Request::new(Operation::Write, "auth/token/create");
        let resp = Response {
            auth: Some(Auth {
                client_token: "sha1:feedbeef".to_string(),
                display_name: "token".to_string(),
                ..Auth::default()
            }),
            secret: Some(crate::protocol::Secret {
                lease_id: "auth/token/create/1234".to_string(),
            }),
            data: json!({"ttl": 3600}).as_object().cloned().unwrap(),
            redirect: String::new(),
        };

        let mut buf = Vec::new();
        JsonFormatter
            .format_response(&mut buf, None, &req, Some(&resp), Some("permission denied"))
            .unwrap();

        let entry = parse_line(&buf);
        assert_eq!(entry["error"], "permission denied");
        assert_eq!(entry["response"]["auth"]["client_token"], "sha1:feedbeef");
        assert_eq!(
            entry["response"]["secret"]["lease_id"],
            "auth/token/create/1234"
        );
        assert_eq!(entry["response"]["data"]["ttl"], 3600);
    }

    #[test]
    fn test_http_entry_schema() {
        let mut request_headers = HeaderMap::new();
        request_headers.insert("x-vault-token".to_string(), vec!["sha1:aa".to_string()]);
        let mut response_headers = HeaderMap::new();
        response_headers.insert("content-type".to_string(), vec!["application/json".to_string()]);

        let exchange = HttpExchange {
            method: "GET".to_string(),
            uri: "/v1/secret/foo".to_string(),
            proto_major: 1,
            proto_minor: 1,
            remote_address: "127.0.0.1".to_string(),
            request_headers,
            request_body: "".to_string(),
            status_code: 200,
            response_headers,
            response_body: "{\"value\":\"sha1:bb\"}".to_string(),
            duration: Duration::from_millis(1234),
        };

        let mut buf = Vec::new();
        JsonFormatter.format_http(&mut buf, &exchange).unwrap();

        let entry = parse_line(&buf);
        assert_eq!(entry["type"], "http");
        assert_eq!(entry["duration"], 1234);
        assert_eq!(entry["http"]["version"], "1.1");
        assert_eq!(entry["http"]["request"]["method"], "GET");
        assert_eq!(entry["http"]["request"]["url"], "/v1/secret/foo");
        assert_eq!(entry["http"]["request"]["remote_address"], "127.0.0.1");
        assert_eq!(
            entry["http"]["request"]["headers"]["x-vault-token"],
            "sha1:aa"
        );
        assert_eq!(entry["http"]["response"]["status"], 200);
        assert_eq!(entry["http"]["response"]["reason"], "OK");
        assert_eq!(
            entry["http"]["response"]["headers"]["content-type"],
            "application/json"
        );
        assert_eq!(
            entry["message"],
            "GET /v1/secret/foo HTTP/1.1\nHTTP/1.1 200 OK"
        );
    }

    #[test]
    fn test_http_entry_duration_truncates_to_millis() {
        let exchange = HttpExchange {
            method: "GET".to_string(),
            uri: "/".to_string(),
            proto_major: 1,
            proto_minor: 0,
            remote_address: String::new(),
            request_headers: HeaderMap::new(),
            request_body: String::new(),
            status_code: 204,
            response_headers: HeaderMap::new(),
            response_body: String::new(),
            duration: Duration::from_micros(2750),
        };

        let mut buf = Vec::new();
        JsonFormatter.format_http(&mut buf, &exchange).unwrap();
        let entry = parse_line(&buf);
        assert_eq!(entry["duration"], 2);
        assert_eq!(entry["http"]["version"], "1.0");
    }

    #[test]
    fn test_status_text_unknown_code_is_empty() {
        assert_eq!(status_text(299), "");
        assert_eq!(status_text(404), "Not Found");
    }
}
