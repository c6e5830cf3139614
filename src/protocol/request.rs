//! Logical request type for the audit pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::auth::Auth;

/// The kind of operation a request performs.
///
/// The lowercase wire representation is part of the audit entry schema
/// and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
    Delete,
    List,
    Help,
    Revoke,
    Renew,
    Rollback,
}

/// A logical request traversing the server.
///
/// The audit pipeline does not validate `path`; it records whatever the
/// router dispatched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// The operation being performed.
    pub operation: Operation,

    /// Logical path the request targets (e.g. `secret/foo`).
    pub path: String,

    /// Request parameters. String leaves are hashed before logging.
    pub data: Map<String, Value>,

    /// Principal inlined on the request, if any.
    pub auth: Option<Auth>,
}

impl Request {
    /// Create a request with no data and no inlined auth.
    pub fn new(operation: Operation, path: impl Into<String>) -> Self {
        Self {
            operation,
            path: path.into(),
            data: Map::new(),
            auth: None,
        }
    }
}

impl Default for Operation {
    fn default() -> Self {
        Operation::Read
    }
}
