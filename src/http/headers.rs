//! Header map representation and sanitization.

use std::collections::BTreeMap;

/// Multi-valued HTTP header map, keyed by header name.
///
/// A `BTreeMap` keeps iteration order deterministic, which keeps encoded
/// audit entries stable across runs.
pub type HeaderMap = BTreeMap<String, Vec<String>>;

/// Sanitize a header map for audit logging.
///
/// Every name is folded to lower case and multi-valued headers are joined
/// with `"; "` into a single value, in their original order. Names that
/// collide after folding are joined as well.
pub fn sanitize_headers(headers: &HeaderMap) -> HeaderMap {
    let mut sanitized = HeaderMap::new();
    for (name, values) in headers {
        sanitized
            .entry(name.to_lowercase())
            .or_default()
            .push(values.join("; "));
    }
    sanitized
}
