//! Fan-out dispatcher for auditable events.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, error};

use crate::barrier::BarrierView;
use crate::error::{AuditError, AuditResult};
use crate::http::{HttpRequest, ResponseWriter, TeeResponseWriter};
use crate::protocol::{Auth, Request, Response};

use super::sink::Sink;

struct BackendEntry {
    sink: Arc<dyn Sink>,
    // Scoped storage handed to the device at mount time; held so it lives
    // exactly as long as the registration.
    _view: Option<BarrierView>,
}

/// Single ingest point for auditable events.
///
/// Every event is offered to every registered device; delivery succeeds
/// when at least one device accepts it. There is no queue and no retry:
/// dispatch is synchronous on the calling worker, and a slow device
/// back-pressures the request that triggered the entry.
///
/// Lock order: callers that also hold the mount-table lock must acquire
/// it before any broker operation, never after.
pub struct AuditBroker {
    backends: RwLock<HashMap<String, BackendEntry>>,
}

impl AuditBroker {
    /// Create a broker with no registered devices.
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(HashMap::new()),
        }
    }

    /// Register a device under `path`, replacing any previous registration
    /// at that path. Paths are used verbatim; normalization is the
    /// caller's job.
    pub fn register(&self, path: impl Into<String>, sink: Arc<dyn Sink>, view: Option<BarrierView>) {
        let path = path.into();
        let mut backends = match self.backends.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        backends.insert(path, BackendEntry { sink, _view: view });
    }

    /// Remove the device registered under `path`, if any. The device is
    /// dropped once no in-flight dispatch still holds it.
    pub fn deregister(&self, path: &str) {
        let mut backends = match self.backends.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        backends.remove(path);
    }

    /// Whether a device is registered under `path`.
    pub fn is_registered(&self, path: &str) -> bool {
        let backends = match self.backends.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        backends.contains_key(path)
    }

    /// Offer a request to every device.
    ///
    /// Returns `Ok(())` when any device logged it, or when none are
    /// registered. When every device fails, each failure has been logged
    /// and the returned error carries the delivery-contract message.
    pub fn log_request(&self, auth: Option<&Auth>, req: &Request) -> AuditResult<()> {
        let backends = match self.backends.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut any_logged = false;
        for (name, entry) in backends.iter() {
            let start = Instant::now();
            let result = entry.sink.log_request(auth, req);
            debug!(
                backend = %name,
                elapsed_us = start.elapsed().as_micros() as u64,
                "dispatched audit request"
            );
            match result {
                Ok(()) => any_logged = true,
                Err(err) => {
                    error!(backend = %name, error = %err, "audit backend failed to log request");
                }
            }
        }

        if !any_logged && !backends.is_empty() {
            return Err(AuditError::AllSinksFailed("request"));
        }
        Ok(())
    }

    /// Offer a completed operation to every device. Same delivery
    /// contract as [`log_request`](Self::log_request).
    pub fn log_response(
        &self,
        auth: Option<&Auth>,
        req: &Request,
        resp: Option<&Response>,
        err: Option<&str>,
    ) -> AuditResult<()> {
        let backends = match self.backends.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut any_logged = false;
        for (name, entry) in backends.iter() {
            let start = Instant::now();
            let result = entry.sink.log_response(auth, req, resp, err);
            debug!(
                backend = %name,
                elapsed_us = start.elapsed().as_micros() as u64,
                "dispatched audit response"
            );
            match result {
                Ok(()) => any_logged = true,
                Err(sink_err) => {
                    error!(
                        backend = %name,
                        error = %sink_err,
                        "audit backend failed to log response"
                    );
                }
            }
        }

        if !any_logged && !backends.is_empty() {
            return Err(AuditError::AllSinksFailed("response"));
        }
        Ok(())
    }

    /// Offer a completed HTTP exchange to every device.
    ///
    /// The response has already been flushed to the client by the time
    /// this runs, so an all-devices failure is logged rather than
    /// propagated.
    pub fn log_http_request(&self, req: &HttpRequest, resp: &TeeResponseWriter) {
        let backends = match self.backends.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut any_logged = false;
        for (name, entry) in backends.iter() {
            let start = Instant::now();
            let result = entry.sink.log_http_request(req, resp);
            debug!(
                backend = %name,
                elapsed_us = start.elapsed().as_micros() as u64,
                "dispatched audit http request"
            );
            match result {
                Ok(()) => any_logged = true,
                Err(err) => {
                    error!(
                        backend = %name,
                        error = %err,
                        "audit backend failed to log http request"
                    );
                }
            }
        }

        if !any_logged && !backends.is_empty() {
            error!("no audit backend succeeded in logging the http request");
        }
    }

    /// Run `handler` with the exchange under audit capture, then fan the
    /// captured exchange out to every device.
    ///
    /// The request body is already teed by [`HttpRequest`] construction;
    /// this wraps the writer, times the handler, and never short-circuits
    /// on audit failure. The client sees exactly what the handler wrote.
    pub fn serve_http<H>(&self, handler: H, writer: Box<dyn ResponseWriter>, req: &mut HttpRequest)
    where
        H: FnOnce(&mut TeeResponseWriter, &mut HttpRequest),
    {
        let start = Instant::now();
        let mut tee = TeeResponseWriter::new(writer);
        handler(&mut tee, req);
        tee.finish(start.elapsed());

        self.log_http_request(req, &tee);
    }
}

impl Default for AuditBroker {
    fn default() -> Self {
        Self::new()
    }
}
