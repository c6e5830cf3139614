//! Tee wrappers for request bodies and response writers.

use std::io::{self, Read};
use std::time::Duration;

use super::headers::HeaderMap;

/// Default status code when the handler never calls `write_status`.
const DEFAULT_STATUS: u16 = 200;

/// A request body that duplicates every byte the handler reads.
///
/// The buffer holds exactly the prefix of the body the handler consumed:
/// bytes the handler never read are not captured, so ignored bodies do
/// not inflate audit volume. The inner reader is closed when the tee is
/// dropped.
pub struct TeeBody {
    inner: Box<dyn Read + Send>,
    captured: Vec<u8>,
}

impl TeeBody {
    /// Wrap a body reader.
    pub fn new(inner: Box<dyn Read + Send>) -> Self {
        Self {
            inner,
            captured: Vec::new(),
        }
    }

    /// Wrap an in-memory body. Convenient for servers that have already
    /// buffered the request, and for tests.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(Box::new(io::Cursor::new(bytes.into())))
    }

    /// The bytes the handler has consumed so far.
    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    /// The consumed bytes as a string, with invalid UTF-8 replaced.
    pub fn captured_string(&self) -> String {
        String::from_utf8_lossy(&self.captured).into_owned()
    }
}

impl Read for TeeBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.captured.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

impl std::fmt::Debug for TeeBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeeBody")
            .field("captured_len", &self.captured.len())
            .finish()
    }
}

/// The response surface the audit middleware wraps.
///
/// Implemented by whatever the server front end uses to emit responses.
/// Mirrors the three operations the tee must intercept: header access,
/// status emission, and body writes.
pub trait ResponseWriter: Send {
    /// The live response header map. Handlers may add headers through it
    /// up to the first status or body write.
    fn headers(&mut self) -> &mut HeaderMap;

    /// Start the response with the given status code.
    fn write_status(&mut self, code: u16);

    /// Write a chunk of the response body.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

/// A response writer that records what the handler emits while forwarding
/// everything to the wrapped writer.
///
/// The header snapshot is taken at the first `write_status`, explicit or
/// implied by the first body write, so it reflects the header map as the
/// response actually started. Handlers that mutate headers afterwards do
/// not affect the snapshot.
pub struct TeeResponseWriter {
    inner: Box<dyn ResponseWriter>,
    status_code: u16,
    wrote_status: bool,
    raw_headers: HeaderMap,
    body: Vec<u8>,
    duration: Duration,
}

impl TeeResponseWriter {
    /// Wrap a response writer.
    pub fn new(inner: Box<dyn ResponseWriter>) -> Self {
        Self {
            inner,
            status_code: DEFAULT_STATUS,
            wrote_status: false,
            raw_headers: HeaderMap::new(),
            body: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// The live header map of the underlying writer.
    pub fn headers(&mut self) -> &mut HeaderMap {
        self.inner.headers()
    }

    /// Record the status and forward it. Only the first call sets the
    /// recorded code and takes the header snapshot.
    pub fn write_status(&mut self, code: u16) {
        if !self.wrote_status {
            self.raw_headers = self.inner.headers().clone();
            self.status_code = code;
            self.wrote_status = true;
        }
        self.inner.write_status(code);
    }

    /// Mirror a body chunk into the capture buffer and forward it.
    ///
    /// An error from the underlying writer propagates; the buffer holds
    /// exactly the bytes the writer accepted before the failure.
    pub fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.wrote_status {
            self.raw_headers = self.inner.headers().clone();
            self.wrote_status = true;
        }
        let n = self.inner.write(buf)?;
        self.body.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    /// Record the exchange duration, and take the header snapshot if the
    /// handler never started a response.
    pub fn finish(&mut self, duration: Duration) {
        if !self.wrote_status {
            self.raw_headers = self.inner.headers().clone();
            self.wrote_status = true;
        }
        self.duration = duration;
    }

    /// The recorded status code (200 if the handler never set one).
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The header map as it stood when the response started.
    pub fn raw_headers(&self) -> &HeaderMap {
        &self.raw_headers
    }

    /// The captured response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The captured body as a string, with invalid UTF-8 replaced.
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Wall time from handler entry to handler exit.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl std::fmt::Debug for TeeResponseWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeeResponseWriter")
            .field("status_code", &self.status_code)
            .field("body_len", &self.body.len())
            .field("duration", &self.duration)
            .finish()
    }
}

/// A response writer backed by in-memory buffers.
///
/// For front ends that assemble the full response before flushing it, and
/// for tests that need to assert on what a handler produced.
#[derive(Debug, Default)]
pub struct BufferedResponseWriter {
    /// Response headers.
    pub headers: HeaderMap,
    /// First status code written, if any.
    pub status_code: Option<u16>,
    /// Accumulated body bytes.
    pub body: Vec<u8>,
}

impl BufferedResponseWriter {
    /// Create an empty buffered writer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseWriter for BufferedResponseWriter {
    fn headers(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, code: u16) {
        self.status_code.get_or_insert(code);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}
