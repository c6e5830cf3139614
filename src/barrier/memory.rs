//! In-memory barrier implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{AuditError, AuditResult};

use super::{Barrier, BarrierEntry};

/// An in-process barrier backed by a hash map.
///
/// Used by tests and by embedders that run the audit subsystem without a
/// sealed store. Cores sharing one `MemoryBarrier` observe each other's
/// persisted audit table.
#[derive(Debug, Default)]
pub struct MemoryBarrier {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBarrier {
    /// Create an empty in-memory barrier.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Barrier for MemoryBarrier {
    fn get(&self, key: &str) -> AuditResult<Option<BarrierEntry>> {
        let entries = self.entries.read().map_err(|e| AuditError::Internal {
            message: format!("barrier lock poisoned: {}", e),
        })?;
        Ok(entries
            .get(key)
            .map(|value| BarrierEntry::new(key, value.clone())))
    }

    fn put(&self, entry: BarrierEntry) -> AuditResult<()> {
        let mut entries = self.entries.write().map_err(|e| AuditError::Internal {
            message: format!("barrier lock poisoned: {}", e),
        })?;
        entries.insert(entry.key, entry.value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key() {
        let barrier = MemoryBarrier::new();
        assert!(barrier.get("absent").unwrap().is_none());
    }

    #[test]
    fn test_put_then_get() {
        let barrier = MemoryBarrier::new();
        barrier
            .put(BarrierEntry::new("core/audit", b"{}".to_vec()))
            .unwrap();

        let entry = barrier.get("core/audit").unwrap().unwrap();
        assert_eq!(entry.key, "core/audit");
        assert_eq!(entry.value, b"{}");
    }

    #[test]
    fn test_put_replaces_value() {
        let barrier = MemoryBarrier::new();
        barrier.put(BarrierEntry::new("k", b"v1".to_vec())).unwrap();
        barrier.put(BarrierEntry::new("k", b"v2".to_vec())).unwrap();

        assert_eq!(barrier.get("k").unwrap().unwrap().value, b"v2");
    }
}
