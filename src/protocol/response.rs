//! Logical response type for the audit pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::auth::Auth;

/// A logical response produced by an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Principal issued by the operation (e.g. a login).
    pub auth: Option<Auth>,

    /// Lease information for a returned secret.
    pub secret: Option<Secret>,

    /// Response payload. String leaves are hashed before logging.
    pub data: Map<String, Value>,

    /// Redirect URL, when the operation must be retried elsewhere.
    pub redirect: String,
}

/// Lease handle carried by responses that return secret material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    /// Identifier used to renew or revoke the lease.
    pub lease_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_default_is_empty() {
        let resp = Response::default();
        assert!(resp.auth.is_none());
        assert!(resp.secret.is_none());
        assert!(resp.data.is_empty());
        assert!(resp.redirect.is_empty());
    }
}
