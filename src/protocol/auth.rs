//! Authenticated principal attached to auditable requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The authenticated principal behind a request or token issuance.
///
/// Created by the authentication layer. The `client_token` is sensitive
/// and is replaced with a salted hash before any entry is written, unless
/// a device is configured with `log_raw`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Auth {
    /// Opaque session token.
    pub client_token: String,

    /// Human-readable name for the principal.
    pub display_name: String,

    /// Policies attached to the token. Duplicates are permitted; order
    /// carries no meaning.
    pub policies: Vec<String>,

    /// Arbitrary metadata recorded at login time.
    pub metadata: BTreeMap<String, String>,
}
