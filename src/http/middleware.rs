//! Request logging middleware.
//!
//! # Data Flow
//! ```text
//! request ─▶ RequestLog::serve_http
//!              ├─ start clock, resolve client IP (proxy headers)
//!              ├─ wrap writer in ResponseCapture
//!              ├─ inner.serve_http(capture, request)   (blocking)
//!              └─ RequestRecord ─▶ Logger::log_request
//! ```
//!
//! # Design Decisions
//! - The middleware observes and never short-circuits the handler
//! - A handler panic unwinds straight through; no record is written for it
//!   (the panic layer reports it instead)
//! - Sink failures are reported through `tracing` and never reach the caller

use std::sync::Arc;
use std::time::Instant;

use axum::http::{Request, Uri};
use bytes::Bytes;
use chrono::Utc;

use super::capture::ResponseCapture;
use super::client_ip::{client_ip, RemoteAddr};
use super::writer::ResponseWriter;
use crate::logger::{Logger, RequestRecord};

/// A blocking HTTP handler writing through a [`ResponseWriter`].
pub trait Handler: Send + Sync {
    fn serve_http(&self, w: &mut dyn ResponseWriter, request: &mut Request<Bytes>);
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve_http(&self, w: &mut dyn ResponseWriter, request: &mut Request<Bytes>) {
        (**self).serve_http(w, request)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn serve_http(&self, w: &mut dyn ResponseWriter, request: &mut Request<Bytes>) {
        (**self).serve_http(w, request)
    }
}

/// Adapts a closure into a [`Handler`].
pub struct HandlerFn<F>(pub F);

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request<Bytes>) + Send + Sync,
{
    fn serve_http(&self, w: &mut dyn ResponseWriter, request: &mut Request<Bytes>) {
        (self.0)(w, request)
    }
}

/// A handler wrapped so every call is timed and logged as one request record.
pub struct RequestLog<H> {
    inner: H,
    logger: Arc<Logger>,
    trust_proxy_headers: bool,
}

impl<H> RequestLog<H> {
    pub fn new(logger: Arc<Logger>, inner: H) -> Self {
        Self {
            inner,
            logger,
            trust_proxy_headers: true,
        }
    }

    /// Whether `X-Forwarded-For` / `X-Real-IP` may replace the transport
    /// address. Enabled by default.
    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }
}

impl<H: Handler> Handler for RequestLog<H> {
    fn serve_http(&self, w: &mut dyn ResponseWriter, request: &mut Request<Bytes>) {
        let started = Instant::now();
        let started_at = Utc::now();

        if self.trust_proxy_headers {
            if let Some(ip) = client_ip(request.headers()) {
                let resolved = RemoteAddr::new(ip);
                request.extensions_mut().insert(resolved);
            }
        }

        let method = request.method().to_string();
        let uri = request_uri(request.uri());
        let client = RemoteAddr::of(request).unwrap_or_default().to_owned();

        let mut capture = ResponseCapture::new(w);
        self.inner.serve_http(&mut capture, request);

        let record = RequestRecord {
            started_at,
            method,
            uri,
            client_ip: client,
            status: capture.status().as_u16(),
            size: capture.bytes_written(),
            duration: started.elapsed(),
        };

        if let Err(e) = self.logger.log_request(&record) {
            tracing::warn!(
                error = %e,
                method = %record.method,
                uri = %record.uri,
                "failed to write request record"
            );
        }
    }
}

/// Returns a function that wraps any handler in [`RequestLog`] with `logger`.
///
/// ```
/// # use std::sync::Arc;
/// # use axum::http::Request;
/// # use bytes::Bytes;
/// # use request_logger::http::{log_request_middleware, HandlerFn, ResponseWriter};
/// # use request_logger::logger::Logger;
/// let logged = log_request_middleware(Arc::new(Logger::plain("svc")));
/// let handler = logged(HandlerFn(|w: &mut dyn ResponseWriter, _req: &mut Request<Bytes>| {
///     let _ = w.write_body(b"ok");
/// }));
/// # let _ = handler;
/// ```
pub fn log_request_middleware<H: Handler>(logger: Arc<Logger>) -> impl Fn(H) -> RequestLog<H> {
    move |handler| RequestLog::new(logger.clone(), handler)
}

/// Path plus query, as the client sent it.
pub(crate) fn request_uri(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str())
        .filter(|pq| !pq.is_empty())
        .unwrap_or("/")
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::writer::Recorder;
    use crate::logger::{Identity, LineFormat, SharedBuffer, Sink};
    use axum::http::StatusCode;

    fn logger(format: LineFormat) -> (Arc<Logger>, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let logger = Logger::new(Identity::new("svc", "0.1.0"), format, Sink::buffer(&buffer));
        (Arc::new(logger), buffer)
    }

    fn request(method: &str, uri: &str) -> Request<Bytes> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
    }

    #[test]
    fn test_request_uri_keeps_query() {
        let uri: Uri = "http://localhost/path?query=10".parse().unwrap();
        assert_eq!(request_uri(&uri), "/path?query=10");
        let uri: Uri = "http://localhost".parse().unwrap();
        assert_eq!(request_uri(&uri), "/");
    }

    #[test]
    fn test_resolved_ip_is_visible_to_handler() {
        let (logger, buffer) = logger(LineFormat::KeyValue);
        let seen = Arc::new(std::sync::Mutex::new(None));
        let seen_in_handler = seen.clone();
        let handler = RequestLog::new(
            logger,
            HandlerFn(move |_w: &mut dyn ResponseWriter, req: &mut Request<Bytes>| {
                *seen_in_handler.lock().unwrap() = RemoteAddr::of(req).map(str::to_owned);
            }),
        );

        let mut req = request("GET", "/");
        req.extensions_mut().insert(RemoteAddr::new("10.1.1.1:4000"));
        req.headers_mut()
            .insert("x-forwarded-for", "1.2.3.4, 5.6.7.8".parse().unwrap());
        handler.serve_http(&mut Recorder::new(), &mut req);

        assert_eq!(seen.lock().unwrap().as_deref(), Some("1.2.3.4"));
        assert!(buffer.contents().contains("ip=\"1.2.3.4\""));
    }

    #[test]
    fn test_untrusted_proxy_headers_keep_transport_address() {
        let (logger, buffer) = logger(LineFormat::KeyValue);
        let handler = RequestLog::new(logger, HandlerFn(|_: &mut dyn ResponseWriter, _: &mut Request<Bytes>| {}))
            .trust_proxy_headers(false);

        let mut req = request("GET", "/");
        req.extensions_mut().insert(RemoteAddr::new("10.1.1.1:4000"));
        req.headers_mut().insert("x-real-ip", "9.9.9.9".parse().unwrap());
        handler.serve_http(&mut Recorder::new(), &mut req);

        assert!(buffer.contents().contains("ip=\"10.1.1.1:4000\""));
    }

    #[test]
    fn test_record_uses_uri_seen_before_handler() {
        let (logger, buffer) = logger(LineFormat::Plain);
        let handler = RequestLog::new(
            logger,
            HandlerFn(|w: &mut dyn ResponseWriter, req: &mut Request<Bytes>| {
                *req.uri_mut() = "/rewritten".parse().unwrap();
                w.set_status(StatusCode::NO_CONTENT);
            }),
        );

        handler.serve_http(&mut Recorder::new(), &mut request("DELETE", "/items/7"));

        let line = buffer.contents();
        assert!(line.contains("] 204 DELETE /items/7 (0) "), "{}", line);
    }

    #[test]
    fn test_middleware_factory_wraps_handler() {
        let (logger, buffer) = logger(LineFormat::Plain);
        let wrap = log_request_middleware(logger);
        let handler = wrap(HandlerFn(|w: &mut dyn ResponseWriter, _: &mut Request<Bytes>| {
            let _ = w.write_body(b"abc");
        }));

        let mut rec = Recorder::new();
        handler.serve_http(&mut rec, &mut request("GET", "/"));

        assert_eq!(rec.body(), b"abc");
        assert_eq!(buffer.lines().len(), 1);
        assert!(buffer.contents().contains("] 200 GET / (3) "));
    }
}
