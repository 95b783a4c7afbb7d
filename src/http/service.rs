//! Hosting blocking [`Handler`]s inside axum/tower.
//!
//! # Data Flow
//! ```text
//! axum request ─▶ HandlerService::call
//!     → collect body (bounded), attach RemoteAddr from ConnectInfo
//!     → spawn_blocking(handler.serve_http(StreamingWriter, request))
//!     → await response head (first flush / first full chunk / handler return)
//!     → axum Response whose body streams from the writer's channel
//! ```
//!
//! # Design Decisions
//! - The handler writes synchronously; a bounded channel applies backpressure
//! - A panic before the head is committed is re-raised on the service future
//!   so a `CatchPanicLayer` above can report it and answer 500
//! - A panic after the head is committed aborts the body stream and is
//!   reported directly

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::mem;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::stream;
use tokio::sync::{mpsc, oneshot};
use tower::Service;

use super::client_ip::RemoteAddr;
use super::middleware::Handler;
use super::panic::PanicLogger;
use super::writer::{Flush, ResponseWriter};

/// Body bytes buffered before a chunk is pushed without an explicit flush.
const CHUNK_SIZE: usize = 8 * 1024;

/// Chunks in flight between the handler thread and the connection.
const CHANNEL_DEPTH: usize = 16;

type Head = (StatusCode, HeaderMap);
type Chunk = Result<Bytes, io::Error>;

/// Tower service running a blocking [`Handler`] per request.
pub struct HandlerService<H> {
    handler: Arc<H>,
    max_body_size: usize,
    panic_logger: Option<PanicLogger>,
}

impl<H> Clone for HandlerService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            max_body_size: self.max_body_size,
            panic_logger: self.panic_logger.clone(),
        }
    }
}

impl<H: Handler + 'static> HandlerService<H> {
    pub fn new(handler: H, max_body_size: usize) -> Self {
        Self {
            handler: Arc::new(handler),
            max_body_size,
            panic_logger: None,
        }
    }

    /// Report panics that happen after the response head was sent.
    pub fn with_panic_logger(mut self, panic_logger: PanicLogger) -> Self {
        self.panic_logger = Some(panic_logger);
        self
    }
}

impl<H: Handler + 'static> Service<Request> for HandlerService<H> {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let handler = self.handler.clone();
        let max_body_size = self.max_body_size;
        let panic_logger = self.panic_logger.clone();

        Box::pin(async move {
            let (mut parts, body) = request.into_parts();
            let body = match axum::body::to_bytes(body, max_body_size).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, uri = %parts.uri, "failed to read request body");
                    return Ok(StatusCode::PAYLOAD_TOO_LARGE.into_response());
                }
            };

            if parts.extensions.get::<RemoteAddr>().is_none() {
                if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
                    let addr = RemoteAddr::new(addr.to_string());
                    parts.extensions.insert(addr);
                }
            }
            let mut request = axum::http::Request::from_parts(parts, body);

            let (mut writer, head_rx, body) = StreamingWriter::channel();
            let task = tokio::task::spawn_blocking(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    handler.serve_http(&mut writer, &mut request)
                }));
                match outcome {
                    Ok(()) => {
                        writer.finish();
                        Ok(())
                    }
                    Err(payload) => {
                        writer.abort();
                        Err(payload)
                    }
                }
            });

            match head_rx.await {
                Ok((status, headers)) => {
                    tokio::spawn(async move {
                        match task.await {
                            Ok(Ok(())) => {}
                            Ok(Err(payload)) => match &panic_logger {
                                Some(reporter) => reporter.report(payload.as_ref()),
                                None => tracing::error!("handler panicked after response head was sent"),
                            },
                            Err(e) => tracing::error!(error = %e, "handler task failed"),
                        }
                    });

                    let mut response = Response::new(body);
                    *response.status_mut() = status;
                    *response.headers_mut() = headers;
                    Ok(response)
                }
                Err(_) => match task.await {
                    Ok(Err(payload)) => panic::resume_unwind(payload),
                    Ok(Ok(())) => Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response()),
                    Err(e) => {
                        tracing::error!(error = %e, "handler task failed");
                        Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response())
                    }
                },
            }
        })
    }
}

/// [`ResponseWriter`] that streams into an axum body through a channel.
///
/// The head (status + headers) is committed on the first flush, the first
/// full chunk, or when the handler returns, whichever comes first.
struct StreamingWriter {
    status: StatusCode,
    headers: HeaderMap,
    head_tx: Option<oneshot::Sender<Head>>,
    body_tx: mpsc::Sender<Chunk>,
    pending: Vec<u8>,
}

impl StreamingWriter {
    fn channel() -> (Self, oneshot::Receiver<Head>, Body) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel::<Chunk>(CHANNEL_DEPTH);

        let chunks = stream::unfold(body_rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        });

        let writer = Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            head_tx: Some(head_tx),
            body_tx,
            pending: Vec::new(),
        };
        (writer, head_rx, Body::from_stream(chunks))
    }

    fn commit_head(&mut self) {
        if let Some(head_tx) = self.head_tx.take() {
            let headers = mem::take(&mut self.headers);
            // Receiver gone means the request future was dropped; writes below fail too.
            let _ = head_tx.send((self.status, headers));
        }
    }

    fn send_pending(&mut self) -> io::Result<()> {
        self.commit_head();
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(mem::take(&mut self.pending));
        self.body_tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client connection closed"))
    }

    fn finish(mut self) {
        if let Err(e) = self.send_pending() {
            tracing::debug!(error = %e, "response body dropped");
        }
    }

    fn abort(mut self) {
        // An uncommitted head is dropped unsent; the service re-raises the panic.
        if self.head_tx.take().is_some() {
            return;
        }
        let _ = self
            .body_tx
            .blocking_send(Err(io::Error::other("handler panicked")));
    }
}

impl ResponseWriter for StreamingWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        if self.head_tx.is_some() {
            self.status = status;
        } else if status != self.status {
            tracing::warn!(status = %status, "status set after response head was sent");
        }
    }

    fn write_body(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.body_tx.is_closed() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client connection closed"));
        }
        self.pending.extend_from_slice(buf);
        if self.pending.len() >= CHUNK_SIZE {
            self.send_pending()?;
        }
        Ok(buf.len())
    }

    fn flusher(&mut self) -> Option<&mut dyn Flush> {
        Some(self)
    }
}

impl Flush for StreamingWriter {
    fn flush(&mut self) -> io::Result<()> {
        self.send_pending()
    }
}
