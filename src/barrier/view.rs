//! Prefix-scoped barrier handle.

use std::fmt;
use std::sync::Arc;

use crate::error::AuditResult;

use super::{Barrier, BarrierEntry};

/// A handle into the barrier restricted to a key prefix.
///
/// Each enabled audit device receives a view scoped to
/// `audit/<uuid>/`, giving it private storage without access to the rest
/// of the barrier. Keys passed to `get`/`put` are relative to the prefix.
#[derive(Clone)]
pub struct BarrierView {
    barrier: Arc<dyn Barrier>,
    prefix: String,
}

impl BarrierView {
    /// Create a view over `barrier` scoped to `prefix`.
    pub fn new(barrier: Arc<dyn Barrier>, prefix: impl Into<String>) -> Self {
        Self {
            barrier,
            prefix: prefix.into(),
        }
    }

    /// The key prefix this view is scoped to.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Fetch an entry by relative key.
    pub fn get(&self, key: &str) -> AuditResult<Option<BarrierEntry>> {
        let entry = self.barrier.get(&self.expand(key))?;
        Ok(entry.map(|e| BarrierEntry::new(key, e.value)))
    }

    /// Write an entry under this view's prefix.
    pub fn put(&self, entry: BarrierEntry) -> AuditResult<()> {
        self.barrier
            .put(BarrierEntry::new(self.expand(&entry.key), entry.value))
    }

    fn expand(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl fmt::Debug for BarrierView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarrierView")
            .field("prefix", &self.prefix)
            .finish()
    }
}
