//! Persisted table of enabled audit devices.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One enabled audit device.
///
/// Serialized field names are capitalized for compatibility with the
/// table layout already persisted by deployed servers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MountEntry {
    /// Mount path, normalized to end in `/` once enabled.
    #[serde(rename = "Path")]
    pub path: String,

    /// Device driver name (`file`, `syslog`, ...).
    #[serde(rename = "Type")]
    pub entry_type: String,

    /// Generated when the device is enabled; scopes its barrier view.
    #[serde(rename = "UUID", default)]
    pub uuid: String,

    /// Driver options as given at enable time.
    #[serde(rename = "Options", default)]
    pub options: HashMap<String, String>,
}

impl MountEntry {
    /// Create an entry with no options; the UUID is assigned at enable
    /// time.
    pub fn new(path: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entry_type: entry_type.into(),
            uuid: String::new(),
            options: HashMap::new(),
        }
    }
}

/// The ordered set of enabled audit devices.
///
/// Only one table is authoritative at a time: mutations clone the table,
/// persist the clone, and only then swap it in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MountTable {
    /// Enabled devices, in enable order.
    #[serde(rename = "Entries")]
    pub entries: Vec<MountEntry>,
}

impl MountTable {
    /// Remove the entry at `path`. Returns whether an entry was removed.
    pub fn remove(&mut self, path: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.path != path);
        self.entries.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_by_path() {
        let mut table = MountTable::default();
        table.entries.push(MountEntry::new("foo/", "file"));
        table.entries.push(MountEntry::new("bar/", "syslog"));

        assert!(table.remove("foo/"));
        assert_eq!(table.entries.len(), 1);
        assert_eq!(table.entries[0].path, "bar/");

        assert!(!table.remove("foo/"));
    }

    #[test]
    fn test_persisted_layout() {
        let mut table = MountTable::default();
        let mut entry = MountEntry::new("foo/", "file");
        entry.uuid = "abc".to_string();
        entry
            .options
            .insert("path".to_string(), "/var/log/audit.log".to_string());
        table.entries.push(entry);

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["Entries"][0]["Path"], "foo/");
        assert_eq!(json["Entries"][0]["Type"], "file");
        assert_eq!(json["Entries"][0]["UUID"], "abc");
        assert_eq!(json["Entries"][0]["Options"]["path"], "/var/log/audit.log");

        let decoded: MountTable = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, table);
    }
}
