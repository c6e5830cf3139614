//! Audit mount lifecycle: enable, disable, load, setup, teardown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{error, info};
use uuid::Uuid;

use crate::barrier::{Barrier, BarrierEntry, BarrierView};
use crate::config::DeviceConfig;
use crate::error::{AuditError, AuditResult};

use super::broker::AuditBroker;
use super::file::FileSink;
use super::sink::{Sink, SinkFactory};
use super::syslog::SyslogSink;
use super::table::{MountEntry, MountTable};

/// Barrier key holding the serialized audit table.
pub const AUDIT_TABLE_KEY: &str = "core/audit";

/// Prefix under which each device gets its scoped barrier view.
const AUDIT_BARRIER_PREFIX: &str = "audit/";

#[derive(Default)]
struct MountState {
    table: Option<MountTable>,
    broker: Option<Arc<AuditBroker>>,
}

/// Owner of the audit mount table and its broker.
///
/// Every mutation follows the same shape: validate under the mount lock,
/// persist a cloned table through the barrier, swap the clone in, then
/// update the broker registry. A mount is therefore either fully enabled
/// (registered and persisted) or absent; there are no intermediate
/// states. The mount lock is always taken before the broker lock.
pub struct AuditMounts {
    barrier: Arc<dyn Barrier>,
    factories: HashMap<String, SinkFactory>,
    state: Mutex<MountState>,
}

impl AuditMounts {
    /// Create the audit subsystem over a barrier, with the built-in
    /// `file` and `syslog` device factories registered.
    pub fn new(barrier: Arc<dyn Barrier>) -> Self {
        let mut mounts = Self {
            barrier,
            factories: HashMap::new(),
            state: Mutex::new(MountState::default()),
        };
        mounts.register_factory("file", Arc::new(FileSink::factory));
        mounts.register_factory("syslog", Arc::new(SyslogSink::factory));
        mounts
    }

    /// Register a device factory under a driver name, replacing any
    /// previous factory with that name.
    pub fn register_factory(&mut self, name: impl Into<String>, factory: SinkFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// The current broker, once [`setup`](Self::setup) or an enable has
    /// installed one.
    pub fn broker(&self) -> Option<Arc<AuditBroker>> {
        self.lock_state().ok()?.broker.clone()
    }

    /// A snapshot of the current in-memory table.
    pub fn table(&self) -> Option<MountTable> {
        self.lock_state().ok()?.table.clone()
    }

    /// Enable a new audit device.
    ///
    /// The entry's path is normalized to end in `/`; its UUID is
    /// assigned here. Rejected when the path is empty, shares a prefix
    /// with an enabled mount in either direction, names an unknown driver
    /// type, or carries options the driver rejects. The table swap only
    /// happens after the new table has been persisted.
    pub fn enable(&self, mut entry: MountEntry) -> AuditResult<()> {
        let mut state = self.lock_state()?;

        if !entry.path.ends_with('/') {
            entry.path.push('/');
        }
        if entry.path == "/" {
            return Err(AuditError::EmptyMountPath);
        }

        let table = state.table.clone().unwrap_or_default();
        for existing in &table.entries {
            if existing.path.starts_with(&entry.path) || entry.path.starts_with(&existing.path) {
                return Err(AuditError::PathInUse);
            }
        }

        let sink = self.new_backend(&entry.entry_type, &entry.options)?;

        entry.uuid = Uuid::new_v4().to_string();
        let view = BarrierView::new(
            Arc::clone(&self.barrier),
            format!("{}{}/", AUDIT_BARRIER_PREFIX, entry.uuid),
        );

        let mut new_table = table;
        new_table.entries.push(entry.clone());
        if let Err(err) = self.persist(&new_table) {
            error!(error = %err, "failed to persist audit table");
            return Err(AuditError::UpdateTableFailed);
        }
        state.table = Some(new_table);

        let broker = state
            .broker
            .get_or_insert_with(|| Arc::new(AuditBroker::new()));
        broker.register(entry.path.clone(), sink, Some(view));

        info!(path = %entry.path, device_type = %entry.entry_type, "enabled audit backend");
        Ok(())
    }

    /// Disable the audit device at `path`.
    pub fn disable(&self, path: &str) -> AuditResult<()> {
        let mut state = self.lock_state()?;

        let mut path = path.to_string();
        if !path.ends_with('/') {
            path.push('/');
        }

        let mut new_table = state.table.clone().unwrap_or_default();
        if !new_table.remove(&path) {
            return Err(AuditError::NoMatchingBackend);
        }

        if let Err(err) = self.persist(&new_table) {
            error!(error = %err, "failed to persist audit table");
            return Err(AuditError::UpdateTableFailed);
        }
        state.table = Some(new_table);

        if let Some(broker) = &state.broker {
            broker.deregister(&path);
        }

        info!(path = %path, "disabled audit backend");
        Ok(())
    }

    /// Load the persisted audit table from the barrier.
    ///
    /// When no table has ever been persisted, the empty default table is
    /// installed and written back.
    pub fn load(&self) -> AuditResult<()> {
        let mut state = self.lock_state()?;

        let raw = self.barrier.get(AUDIT_TABLE_KEY).map_err(|err| {
            error!(error = %err, "failed to read audit table");
            AuditError::SetupTableFailed
        })?;

        let table = match raw {
            Some(entry) => serde_json::from_slice(&entry.value).map_err(|err| {
                error!(error = %err, "failed to decode audit table");
                AuditError::SetupTableFailed
            })?,
            None => {
                let table = MountTable::default();
                self.persist(&table).map_err(|err| {
                    error!(error = %err, "failed to persist default audit table");
                    AuditError::SetupTableFailed
                })?;
                table
            }
        };

        state.table = Some(table);
        Ok(())
    }

    /// Instantiate and register every device in the loaded table under a
    /// fresh broker.
    pub fn setup(&self) -> AuditResult<()> {
        let mut state = self.lock_state()?;

        let table = state.table.clone().unwrap_or_default();
        let broker = AuditBroker::new();
        for entry in &table.entries {
            let sink = self
                .new_backend(&entry.entry_type, &entry.options)
                .map_err(|err| {
                    error!(
                        path = %entry.path,
                        device_type = %entry.entry_type,
                        error = %err,
                        "failed to create audit backend"
                    );
                    AuditError::SetupTableFailed
                })?;
            let view = BarrierView::new(
                Arc::clone(&self.barrier),
                format!("{}{}/", AUDIT_BARRIER_PREFIX, entry.uuid),
            );
            broker.register(entry.path.clone(), sink, Some(view));
        }

        state.broker = Some(Arc::new(broker));
        Ok(())
    }

    /// Drop the table and broker. Reversed by
    /// [`load`](Self::load) + [`setup`](Self::setup).
    pub fn teardown(&self) {
        if let Ok(mut state) = self.lock_state() {
            state.table = None;
            state.broker = None;
        }
    }

    /// Enable every device named in the server configuration.
    pub fn enable_configured(&self, devices: &[DeviceConfig]) -> AuditResult<()> {
        for device in devices {
            let mut entry = MountEntry::new(&device.path, &device.device_type);
            entry.options = device.options.clone();
            self.enable(entry)?;
        }
        Ok(())
    }

    fn new_backend(
        &self,
        entry_type: &str,
        options: &HashMap<String, String>,
    ) -> AuditResult<Arc<dyn Sink>> {
        let factory = self
            .factories
            .get(entry_type)
            .ok_or_else(|| AuditError::Config {
                message: format!("unknown backend type: {}", entry_type),
            })?;
        factory(options)
    }

    fn persist(&self, table: &MountTable) -> AuditResult<()> {
        let raw = serde_json::to_vec(table)?;
        self.barrier.put(BarrierEntry::new(AUDIT_TABLE_KEY, raw))
    }

    fn lock_state(&self) -> AuditResult<std::sync::MutexGuard<'_, MountState>> {
        self.state.lock().map_err(|e| AuditError::Internal {
            message: format!("audit mount lock poisoned: {}", e),
        })
    }
}
