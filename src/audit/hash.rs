//! Structure-walking redaction of sensitive values.
//!
//! Audit entries must never carry secret material in the clear. Before a
//! device encodes an entry, every string leaf in the logged structures is
//! replaced with a deterministic salted SHA-1 (`sha1:<hex>`), so operators
//! can still correlate identical values across entries without being able
//! to recover them. Map keys are never rewritten.

use ring::digest;
use serde_json::{Map, Value};

use crate::error::AuditResult;
use crate::http::{HeaderMap, HttpExchange};
use crate::protocol::{Auth, Request, Response};

/// Request headers whose values carry credentials and are always hashed.
const SENSITIVE_HEADERS: &[&str] = &["x-vault-token", "cookie"];

/// Hash every string leaf of a JSON tree through `callback`.
///
/// Object values and array elements are visited recursively; object keys
/// and non-string scalars pass through untouched. The input is never
/// mutated; a rewritten clone is returned. A callback error aborts the
/// walk and surfaces unchanged.
pub fn hash_structure<F>(value: &Value, callback: &F) -> AuditResult<Value>
where
    F: Fn(&str) -> AuditResult<String>,
{
    Ok(match value {
        Value::Object(map) => {
            let mut hashed = Map::with_capacity(map.len());
            for (key, val) in map {
                hashed.insert(key.clone(), hash_structure(val, callback)?);
            }
            Value::Object(hashed)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| hash_structure(item, callback))
                .collect::<AuditResult<Vec<_>>>()?,
        ),
        Value::String(s) => Value::String(callback(s)?),
        other => other.clone(),
    })
}

/// Salted-hash redactor for the typed structures the broker dispatches.
///
/// The salt is fixed per device instance; with an empty salt two devices
/// produce identical hashes for identical values.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    salt: String,
}

impl Redactor {
    /// Create a redactor with the given salt.
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    /// Hash a single value: `"sha1:" + hex(sha1(value || salt))`.
    pub fn hash(&self, value: &str) -> String {
        let mut ctx = digest::Context::new(&digest::SHA1_FOR_LEGACY_USE_ONLY);
        ctx.update(value.as_bytes());
        ctx.update(self.salt.as_bytes());
        format!("sha1:{}", hex::encode(ctx.finish().as_ref()))
    }

    /// Redact a principal: only the client token is sensitive. An empty
    /// token stays empty so it can still be omitted from entries.
    pub fn redact_auth(&self, auth: &Auth) -> Auth {
        let mut redacted = auth.clone();
        if !redacted.client_token.is_empty() {
            redacted.client_token = self.hash(&redacted.client_token);
        }
        redacted
    }

    /// Redact a request: the inlined auth and every string leaf of `data`.
    pub fn redact_request(&self, req: &Request) -> AuditResult<Request> {
        let mut redacted = req.clone();
        redacted.auth = req.auth.as_ref().map(|auth| self.redact_auth(auth));
        redacted.data = self.redact_data(&req.data)?;
        Ok(redacted)
    }

    /// Redact a response: the issued auth and every string leaf of `data`.
    /// Lease IDs and redirect URLs are not secret and pass through.
    pub fn redact_response(&self, resp: &Response) -> AuditResult<Response> {
        let mut redacted = resp.clone();
        redacted.auth = resp.auth.as_ref().map(|auth| self.redact_auth(auth));
        redacted.data = self.redact_data(&resp.data)?;
        Ok(redacted)
    }

    /// Redact a sanitized header map: values under the well-known
    /// credential headers are hashed; every other header passes through.
    pub fn redact_headers(&self, headers: &HeaderMap) -> HeaderMap {
        let mut redacted = headers.clone();
        for name in SENSITIVE_HEADERS {
            if let Some(values) = redacted.get_mut(*name) {
                for value in values.iter_mut() {
                    *value = self.hash(value);
                }
            }
        }
        redacted
    }

    /// Redact a captured HTTP exchange: both bodies whole, credential
    /// headers on both sides.
    pub fn redact_exchange(&self, exchange: &HttpExchange) -> HttpExchange {
        let mut redacted = exchange.clone();
        redacted.request_headers = self.redact_headers(&exchange.request_headers);
        redacted.request_body = self.hash(&exchange.request_body);
        redacted.response_headers = self.redact_headers(&exchange.response_headers);
        redacted.response_body = self.hash(&exchange.response_body);
        redacted
    }

    fn redact_data(&self, data: &Map<String, Value>) -> AuditResult<Map<String, Value>> {
        let callback = |s: &str| Ok(self.hash(s));
        let mut redacted = Map::with_capacity(data.len());
        for (key, value) in data {
            redacted.insert(key.clone(), hash_structure(value, &callback)?);
        }
        Ok(redacted)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::Operation;

    // sha1("abcd") with an empty salt.
    const ABCD_HASH: &str = "sha1:81fe8bfe87576c3ecb22426f8e57847382917acf";

    #[test]
    fn test_hash_known_vector() {
        let redactor = Redactor::default();
        assert_eq!(redactor.hash("abcd"), ABCD_HASH);
    }

    #[test]
    fn test_salt_changes_hash() {
        let plain = Redactor::default();
        let salted = Redactor::new("pepper");
        assert_ne!(plain.hash("abcd"), salted.hash("abcd"));
        // Salt is appended, so this matches the unsalted concatenation.
        assert_eq!(salted.hash("abcd"), plain.hash("abcdpepper"));
    }

    #[test]
    fn test_hash_structure_rewrites_string_leaves_only() {
        let redactor = Redactor::default();
        let callback = |s: &str| Ok(redactor.hash(s));
        let value = json!({
            "token": "abcd",
            "count": 3,
            "active": true,
            "note": null,
            "nested": {"inner": "abcd"},
            "list": ["abcd", 7],
        });

        let hashed = hash_structure(&value, &callback).unwrap();
        assert_eq!(hashed["token"], ABCD_HASH);
        assert_eq!(hashed["count"], 3);
        assert_eq!(hashed["active"], true);
        assert_eq!(hashed["note"], Value::Null);
        assert_eq!(hashed["nested"]["inner"], ABCD_HASH);
        assert_eq!(hashed["list"][0], ABCD_HASH);
        assert_eq!(hashed["list"][1], 7);

        // Keys survive untouched.
        assert!(hashed.get("token").is_some());
        assert!(hashed.get("nested").is_some());
    }

    #[test]
    fn test_hash_structure_callback_error_aborts() {
        let callback = |_: &str| {
            Err(crate::error::AuditError::Internal {
                message: "boom".to_string(),
            })
        };
        let value = json!({"a": "x"});
        assert!(hash_structure(&value, &callback).is_err());
    }

    #[test]
    fn test_redact_auth_hashes_token_only() {
        let redactor = Redactor::default();
        let auth = Auth {
            client_token: "abcd".to_string(),
            display_name: "root".to_string(),
            policies: vec!["dev".to_string()],
            ..Auth::default()
        };

        let redacted = redactor.redact_auth(&auth);
        assert_eq!(redacted.client_token, ABCD_HASH);
        assert_eq!(redacted.display_name, "root");
        assert_eq!(redacted.policies, vec!["dev"]);

        // The caller's value is untouched.
        assert_eq!(auth.client_token, "abcd");
    }

    #[test]
    fn test_redact_auth_keeps_empty_token_empty() {
        let redactor = Redactor::default();
        let redacted = redactor.redact_auth(&Auth::default());
        assert!(redacted.client_token.is_empty());
    }

    #[test]
    fn test_redact_request_recurses_into_auth_and_data() {
        let redactor = Redactor::default();
        let mut req = Request::new(Operation::Write, "secret/foo");
        req.data = json!({"password": "abcd", "ttl": 30})
            .as_object()
            .cloned()
            .unwrap();
        req.auth = Some(Auth {
            client_token: "abcd".to_string(),
            ..Auth::default()
        });

        let redacted = redactor.redact_request(&req).unwrap();
        assert_eq!(redacted.data["password"], ABCD_HASH);
        assert_eq!(redacted.data["ttl"], 30);
        assert_eq!(redacted.auth.unwrap().client_token, ABCD_HASH);
        assert_eq!(redacted.path, "secret/foo");

        assert_eq!(req.data["password"], "abcd");
    }

    #[test]
    fn test_redact_response_keeps_lease_and_redirect() {
        let redactor = Redactor::default();
        let resp = Response {
            secret: Some(crate::protocol::Secret {
                lease_id: "secret/foo/1234".to_string(),
            }),
            data: json!({"key": "abcd"}).as_object().cloned().unwrap(),
            redirect: "https://standby.example.com".to_string(),
            ..Response::default()
        };

        let redacted = redactor.redact_response(&resp).unwrap();
        assert_eq!(redacted.data["key"], ABCD_HASH);
        assert_eq!(redacted.secret.unwrap().lease_id, "secret/foo/1234");
        assert_eq!(redacted.redirect, "https://standby.example.com");
    }

    #[test]
    fn test_redact_headers_hashes_credential_headers_only() {
        let redactor = Redactor::default();
        let mut headers = HeaderMap::new();
        headers.insert("x-vault-token".to_string(), vec!["abcd".to_string()]);
        headers.insert("cookie".to_string(), vec!["abcd".to_string()]);
        headers.insert("x-other".to_string(), vec!["abcd".to_string()]);

        let redacted = redactor.redact_headers(&headers);
        assert_eq!(redacted["x-vault-token"], vec![ABCD_HASH]);
        assert_eq!(redacted["cookie"], vec![ABCD_HASH]);
        assert_eq!(redacted["x-other"], vec!["abcd"]);
    }

    #[test]
    fn test_redaction_is_shape_preserving_when_repeated() {
        let redactor = Redactor::default();
        let mut req = Request::new(Operation::Write, "secret/foo");
        req.data = json!({"a": "x", "b": ["y"], "c": 1})
            .as_object()
            .cloned()
            .unwrap();

        let once = redactor.redact_request(&req).unwrap();
        let twice = redactor.redact_request(&once).unwrap();

        // Same shape and keys; string leaves are hashes of hashes.
        assert_eq!(once.data.len(), twice.data.len());
        assert_eq!(
            twice.data["a"],
            Value::String(redactor.hash(once.data["a"].as_str().unwrap()))
        );
        assert_eq!(
            twice.data["b"][0],
            Value::String(redactor.hash(once.data["b"][0].as_str().unwrap()))
        );
        assert_eq!(twice.data["c"], 1);
    }
}
