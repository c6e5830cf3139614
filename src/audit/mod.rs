//! Audit pipeline: redaction, encoding, devices, and fan-out dispatch.
//!
//! Every authenticated request/response pair (and, when enabled, every
//! raw HTTP exchange) flows through here on its way to one or more
//! configured audit devices:
//!
//! 1. The [`AuditBroker`] fans each event out to every registered device
//!    and enforces the at-least-one-success delivery contract.
//! 2. Each device clones the event, replaces sensitive string leaves
//!    with salted hashes via the [`Redactor`], and encodes the result
//!    through the shared [`JsonFormatter`] as one JSON line.
//! 3. [`AuditMounts`] owns which devices are enabled, persisting the
//!    mount table through the barrier so it survives seal/unseal.

mod broker;
mod file;
mod format;
mod hash;
mod mounts;
mod sink;
mod syslog;
mod table;

pub use broker::AuditBroker;
pub use file::FileSink;
pub use format::JsonFormatter;
pub use hash::{hash_structure, Redactor};
pub use mounts::{AuditMounts, AUDIT_TABLE_KEY};
pub use sink::{Sink, SinkFactory, SinkOptions};
pub use syslog::SyslogSink;
pub use table::{MountEntry, MountTable};
