//! Syslog-backed audit device.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use syslog::{Facility, Formatter3164, Logger, LoggerBackend};

use crate::error::{AuditError, AuditResult};
use crate::http::{HttpRequest, TeeResponseWriter};
use crate::protocol::{Auth, Request, Response};

use super::hash::Redactor;
use super::sink::{render_http, render_request, render_response, Sink, SinkOptions};

/// Default process tag stamped on each record.
const DEFAULT_TAG: &str = "secretd";

/// Audit device that writes one syslog record per entry at INFO severity.
///
/// Connects to the local syslog daemon over its unix socket when the
/// device is enabled; a daemon that is not listening rejects the mount.
pub struct SyslogSink {
    logger: Mutex<Logger<LoggerBackend, Formatter3164>>,
    options: SinkOptions,
    redactor: Redactor,
}

impl SyslogSink {
    /// Device factory registered under the `syslog` type.
    ///
    /// Options: `facility` (default `AUTH`) and `tag` (default the server
    /// name), plus the shared `log_raw` / `log_http` flags.
    pub fn factory(options: &HashMap<String, String>) -> AuditResult<Arc<dyn Sink>> {
        let facility = match options.get("facility") {
            None => Facility::LOG_AUTH,
            Some(raw) => parse_facility(raw)?,
        };
        let tag = options
            .get("tag")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TAG.to_string());
        let parsed = SinkOptions::from_options(options)?;

        let formatter = Formatter3164 {
            facility,
            hostname: None,
            process: tag,
            pid: std::process::id(),
        };
        let logger = syslog::unix(formatter).map_err(|e| AuditError::Sink {
            message: format!("failed to connect to syslog: {}", e),
        })?;

        Ok(Arc::new(Self {
            logger: Mutex::new(logger),
            options: parsed,
            redactor: Redactor::default(),
        }))
    }

    fn write_record(&self, line: &[u8]) -> AuditResult<()> {
        let mut logger = self.logger.lock().map_err(|e| AuditError::Internal {
            message: format!("syslog lock poisoned: {}", e),
        })?;
        logger
            .info(String::from_utf8_lossy(line).trim_end())
            .map_err(|e| AuditError::Sink {
                message: format!("failed to write syslog record: {}", e),
            })
    }
}

impl Sink for SyslogSink {
    fn log_request(&self, auth: Option<&Auth>, req: &Request) -> AuditResult<()> {
        if self.options.log_http {
            return Ok(());
        }
        let line = render_request(self.options, &self.redactor, auth, req)?;
        self.write_record(&line)
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
        self.write_record(&line)
    }

    fn log_http_request(&self, req: &HttpRequest, resp: &TeeResponseWriter) -> AuditResult<()> {
        if !self.options.log_http {
            return Ok(());
        }
        let line = render_http(self.options, &self.redactor, req, resp)?;
        self.write_record(&line)
    }
}

fn parse_facility(raw: &str) -> AuditResult<Facility> {
    let facility = match raw.to_uppercase().as_str() {
        "KERN" => Facility::LOG_KERN,
        "USER" => Facility::LOG_USER,
        "MAIL" => Facility::LOG_MAIL,
        "DAEMON" => Facility::LOG_DAEMON,
        "AUTH" => Facility::LOG_AUTH,
        "SYSLOG" => Facility::LOG_SYSLOG,
        "LPR" => Facility::LOG_LPR,
        "NEWS" => Facility::LOG_NEWS,
        "UUCP" => Facility::LOG_UUCP,
        "CRON" => Facility::LOG_CRON,
        "AUTHPRIV" => Facility::LOG_AUTHPRIV,
        "FTP" => Facility::LOG_FTP,
        "LOCAL0" => Facility::LOG_LOCAL0,
        "LOCAL1" => Facility::LOG_LOCAL1,
        "LOCAL2" => Facility::LOG_LOCAL2,
        "LOCAL3" => Facility::LOG_LOCAL3,
        "LOCAL4" => Facility::LOG_LOCAL4,
        "LOCAL5" => Facility::LOG_LOCAL5,
        "LOCAL6" => Facility::LOG_LOCAL6,
        "LOCAL7" => Facility::LOG_LOCAL7,
        other => {
            return Err(AuditError::Config {
                message: format!("unknown syslog facility: {}", other),
            })
        }
    };
    Ok(facility)
}
