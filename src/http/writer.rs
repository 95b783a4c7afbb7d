//! The outbound response interface handlers write through.

use std::io;

use axum::http::{HeaderMap, StatusCode};

/// Optional capability: push buffered response bytes to the client now.
pub trait Flush {
    fn flush(&mut self) -> io::Result<()>;
}

/// An outbound HTTP response that is written incrementally.
///
/// Implementations commit the status on the first `set_status` or body write;
/// later status changes are recorded by wrappers but ignored by the transport.
pub trait ResponseWriter: Send {
    /// Response headers; changes after the head is committed have no effect.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Set the response status code.
    fn set_status(&mut self, status: StatusCode);

    /// Write body bytes, returning how many were accepted.
    fn write_body(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Probe for the [`Flush`] capability.
    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        None
    }
}

/// In-memory [`ResponseWriter`], the test double for a real transport.
#[derive(Debug, Clone)]
pub struct Recorder {
    statuses: Vec<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    flushes: usize,
    flush_capable: bool,
}

impl Recorder {
    /// A recorder that supports [`Flush`].
    pub fn new() -> Self {
        Self {
            statuses: Vec::new(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            flushes: 0,
            flush_capable: true,
        }
    }

    /// A recorder whose `flusher()` probe reports no capability.
    pub fn without_flush() -> Self {
        Self {
            flush_capable: false,
            ..Self::new()
        }
    }

    /// The committed status: the first one set, or 200 when none was.
    pub fn status(&self) -> StatusCode {
        self.statuses.first().copied().unwrap_or(StatusCode::OK)
    }

    /// Every status forwarded to this recorder, in call order.
    pub fn statuses(&self) -> &[StatusCode] {
        &self.statuses
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter for Recorder {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        self.statuses.push(status);
    }

    fn write_body(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        if self.flush_capable {
            Some(self)
        } else {
            None
        }
    }
}

impl Flush for Recorder {
    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
