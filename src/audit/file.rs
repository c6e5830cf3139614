//! File-backed audit device.
//!
//! Appends one JSON line per entry to a user-specified path. No rotation
//! and no write cursor management; external tooling owns the file's
//! lifecycle beyond appending.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{AuditError, AuditResult};
use crate::http::{HttpRequest, TeeResponseWriter};
use crate::protocol::{Auth, Request, Response};

use super::hash::Redactor;
use super::sink::{render_http, render_request, render_response, Sink, SinkOptions};

/// Audit device that appends entries to a file.
///
/// The file is opened once, on the first entry, so enabling the device
/// succeeds even when the target path only becomes writable later.
/// Writes are serialized by the handle's mutex; line integrity across
/// processes relies on append-mode atomicity of the underlying OS.
pub struct FileSink {
    path: PathBuf,
    options: SinkOptions,
    redactor: Redactor,
    file: Mutex<Option<File>>,
}

impl FileSink {
    /// Device factory registered under the `file` type.
    ///
    /// Requires a `path` option; honors the shared `log_raw` / `log_http`
    /// flags.
    pub fn factory(options: &HashMap<String, String>) -> AuditResult<Arc<dyn Sink>> {
        let path = options.get("path").ok_or_else(|| AuditError::Config {
            message: "path is required".to_string(),
        })?;
        Ok(Arc::new(Self::new(path, SinkOptions::from_options(options)?)))
    }

    /// Create a file sink writing to `path`.
    pub fn new(path: impl Into<PathBuf>, options: SinkOptions) -> Self {
        Self {
            path: path.into(),
            options,
            redactor: Redactor::default(),
            file: Mutex::new(None),
        }
    }

    /// The path entries are appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, line: &[u8]) -> AuditResult<()> {
        let mut guard = self.file.lock().map_err(|e| AuditError::Internal {
            message: format!("audit file lock poisoned: {}", e),
        })?;
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(line)?;
        }
        Ok(())
    }

    fn open(&self) -> AuditResult<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!(path = %parent.display(), "creating audit log directory");
                std::fs::create_dir_all(parent)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
                }
            }
        }

        let mut opts = OpenOptions::new();
        opts.append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let file = opts.open(&self.path)?;
        debug!(path = %self.path.display(), "audit log file opened");
        Ok(file)
    }
}

impl Sink for FileSink {
    fn log_request(&self, auth: Option<&Auth>, req: &Request) -> AuditResult<()> {
        if self.options.log_http {
            return Ok(());
        }
        let line = render_request(self.options, &self.redactor, auth, req)?;
        self.write_line(&line)
    }

    fn log_response(
        &self,
        auth: Option<&Auth>,
        req: &Request,
        resp: Option<&Response>,
        err: Option<&str>,
    ) -> AuditResult<()> {
        if self.options.log_http {
            return Ok(());
        }
        let line = render_response(self.options, &self.redactor, auth, req, resp, err)?;
        self.write_line(&line)
    }

    fn log_http_request(&self, req: &HttpRequest, resp: &TeeResponseWriter) -> AuditResult<()> {
        if !self.options.log_http {
            return Ok(());
        }
        let line = render_http(self.options, &self.redactor, req, resp)?;
        self.write_line(&line)
    }
}
