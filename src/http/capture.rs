//! Response capture.
//!
//! [`ResponseCapture`] decorates the real [`ResponseWriter`] for exactly one
//! request. Handlers see an ordinary writer; the middleware reads back the
//! status and byte count once the handler returns.

use std::io;

use axum::http::{HeaderMap, StatusCode};

use super::writer::{Flush, ResponseWriter};

/// Records the status code and body size written through it.
pub struct ResponseCapture<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: StatusCode,
    bytes_written: u64,
    status_written: bool,
}

impl<'a> ResponseCapture<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            status: StatusCode::OK,
            bytes_written: 0,
            status_written: false,
        }
    }

    /// Last status passed to `set_status`, 200 if none was.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sum of the byte counts the underlying writer accepted.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Whether a status has been committed, explicitly or by a body write.
    pub fn status_written(&self) -> bool {
        self.status_written
    }
}

impl ResponseWriter for ResponseCapture<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    // Duplicate calls are forwarded too; the transport decides which one counts.
    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
        self.status_written = true;
        self.inner.set_status(status);
    }

    fn write_body(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.status_written {
            self.set_status(StatusCode::OK);
        }
        let n = self.inner.write_body(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        if self.inner.flusher().is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl Flush for ResponseCapture<'_> {
    /// Flush the wrapped writer; a no-op when it cannot flush.
    fn flush(&mut self) -> io::Result<()> {
        match self.inner.flusher() {
            Some(flusher) => flusher.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::writer::Recorder;

    /// Accepts at most `limit` bytes per write.
    struct ShortWriter {
        headers: HeaderMap,
        limit: usize,
        accepted: Vec<u8>,
    }

    impl ResponseWriter for ShortWriter {
        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn set_status(&mut self, _status: StatusCode) {}

        fn write_body(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.accepted.extend_from_slice(&buf[..n]);
            Ok(n)
        }
    }

    struct FailingWriter(HeaderMap);

    impl ResponseWriter for FailingWriter {
        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.0
        }

        fn set_status(&mut self, _status: StatusCode) {}

        fn write_body(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away"))
        }
    }

    #[test]
    fn test_body_write_implies_ok() {
        let mut rec = Recorder::new();
        let mut capture = ResponseCapture::new(&mut rec);
        assert!(!capture.status_written());

        capture.write_body(b"hello").unwrap();

        assert!(capture.status_written());
        assert_eq!(capture.status(), StatusCode::OK);
        assert_eq!(rec.statuses(), &[StatusCode::OK]);
    }

    #[test]
    fn test_explicit_status_is_not_overridden_by_write() {
        let mut rec = Recorder::new();
        let mut capture = ResponseCapture::new(&mut rec);
        capture.set_status(StatusCode::NOT_FOUND);
        capture.write_body(b"missing").unwrap();

        assert_eq!(capture.status(), StatusCode::NOT_FOUND);
        assert_eq!(rec.statuses(), &[StatusCode::NOT_FOUND]);
    }

    #[test]
    fn test_repeated_status_last_write_wins_and_forwards() {
        let mut rec = Recorder::new();
        let mut capture = ResponseCapture::new(&mut rec);
        capture.set_status(StatusCode::ACCEPTED);
        capture.set_status(StatusCode::CONFLICT);

        assert_eq!(capture.status(), StatusCode::CONFLICT);
        assert_eq!(rec.statuses(), &[StatusCode::ACCEPTED, StatusCode::CONFLICT]);
        assert_eq!(rec.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_bytes_accumulate_across_writes() {
        let mut rec = Recorder::new();
        let mut capture = ResponseCapture::new(&mut rec);
        for size in [10, 20, 70] {
            capture.write_body(&vec![b'x'; size]).unwrap();
        }
        assert_eq!(capture.bytes_written(), 100);
        assert_eq!(rec.body().len(), 100);
    }

    #[test]
    fn test_counts_accepted_bytes_on_short_write() {
        let mut short = ShortWriter {
            headers: HeaderMap::new(),
            limit: 4,
            accepted: Vec::new(),
        };
        let mut capture = ResponseCapture::new(&mut short);
        assert_eq!(capture.write_body(b"0123456789").unwrap(), 4);
        assert_eq!(capture.bytes_written(), 4);
        assert_eq!(short.accepted, b"0123");
    }

    #[test]
    fn test_write_error_is_returned_unchanged() {
        let mut failing = FailingWriter(HeaderMap::new());
        let mut capture = ResponseCapture::new(&mut failing);
        let err = capture.write_body(b"data").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(capture.bytes_written(), 0);
        assert!(capture.status_written());
    }

    #[test]
    fn test_flush_forwards_when_supported() {
        let mut rec = Recorder::new();
        let mut capture = ResponseCapture::new(&mut rec);
        capture.write_body(b"chunk").unwrap();
        capture.flusher().expect("recorder can flush").flush().unwrap();
        Flush::flush(&mut capture).unwrap();
        assert_eq!(rec.flushes(), 2);
    }

    #[test]
    fn test_flush_is_noop_when_unsupported() {
        let mut rec = Recorder::without_flush();
        let mut capture = ResponseCapture::new(&mut rec);
        assert!(capture.flusher().is_none());
        Flush::flush(&mut capture).unwrap();
        assert_eq!(rec.flushes(), 0);
    }

    #[test]
    fn test_headers_pass_through() {
        let mut rec = Recorder::new();
        let mut capture = ResponseCapture::new(&mut rec);
        capture
            .headers_mut()
            .insert("content-type", "text/plain".parse().unwrap());
        assert_eq!(rec.headers()["content-type"], "text/plain");
    }
}
