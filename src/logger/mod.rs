//! Line logger.
//!
//! # Data Flow
//! ```text
//! log / log_error / log_warning / log_panic / log_request
//!     → format.rs (encode one line into the reusable buffer)
//!     → sink.rs (single write_all + flush, under the logger mutex)
//! ```
//!
//! # Design Decisions
//! - One mutex guards both the line buffer and the sink, so concurrent callers
//!   never interleave partial lines
//! - The sink can be swapped at runtime (tests capture into a `SharedBuffer`)
//! - Every call reports sink failures to the caller; the middleware decides
//!   whether to swallow them

pub mod format;
pub mod global;
pub mod record;
pub mod sink;

use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use thiserror::Error;

pub use format::{Event, Identity, LineFormat, ParseFormatError};
pub use record::RequestRecord;
pub use sink::{SharedBuffer, Sink};

/// Errors returned by logging calls.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The sink rejected the write or flush.
    #[error("log sink write failed: {0}")]
    Io(#[from] io::Error),

    /// A fatal condition was logged; the caller should terminate.
    #[error("fatal: {0}")]
    Fatal(String),
}

/// Result type for logging calls.
pub type LoggerResult<T = ()> = Result<T, LoggerError>;

struct Inner {
    sink: Sink,
    buf: Vec<u8>,
}

/// Timestamped, tagged line logger shared by every request.
pub struct Logger {
    identity: Identity,
    format: LineFormat,
    inner: Mutex<Inner>,
}

impl Logger {
    /// Create a logger writing `format` lines to `sink`.
    pub fn new(identity: Identity, format: LineFormat, sink: Sink) -> Self {
        Self {
            identity,
            format,
            inner: Mutex::new(Inner {
                sink,
                buf: Vec::with_capacity(256),
            }),
        }
    }

    /// Plain-text logger on standard out tagged with `name`.
    pub fn plain(name: impl Into<String>) -> Self {
        Self::new(Identity::new(name, ""), LineFormat::Plain, Sink::stdout())
    }

    /// Key=value logger on standard out tagged with `app` and `version`.
    pub fn key_value(app: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(Identity::new(app, version), LineFormat::KeyValue, Sink::stdout())
    }

    /// Builder-style sink replacement.
    pub fn with_sink(self, sink: Sink) -> Self {
        self.set_sink(sink);
        self
    }

    /// Replace the output sink. Lines already written stay where they went.
    pub fn set_sink(&self, sink: Sink) {
        let mut inner = self.lock();
        if let Err(e) = inner.sink.flush() {
            tracing::warn!(error = %e, sink = inner.sink.label(), "failed to flush replaced log sink");
        }
        inner.sink = sink;
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn format(&self) -> LineFormat {
        self.format
    }

    /// Log an informational message.
    pub fn log(&self, message: &str) -> LoggerResult {
        self.emit(Event::Info(message))
    }

    /// Log an error as `error: <err>`.
    pub fn log_error(&self, err: &dyn fmt::Display) -> LoggerResult {
        self.emit(Event::Error(&err.to_string()))
    }

    /// Log a warning as `warning: <message>`.
    pub fn log_warning(&self, message: &str) -> LoggerResult {
        self.emit(Event::Warning(message))
    }

    /// Log a recovered panic message followed by its (truncated) backtrace.
    pub fn log_panic(&self, message: &str, stack: &str) -> LoggerResult {
        self.emit(Event::Panic { message, stack })
    }

    /// Log one completed request.
    pub fn log_request(&self, record: &RequestRecord) -> LoggerResult {
        self.emit(Event::Request(record))
    }

    /// Write a fatal line and hand back the error to propagate.
    ///
    /// The line is written and flushed before this returns, so terminating on
    /// the returned value never loses it.
    pub fn fatal(&self, message: impl fmt::Display) -> LoggerError {
        let message = message.to_string();
        if let Err(e) = self.emit(Event::Fatal(&message)) {
            tracing::error!(error = %e, message = %message, "failed to write fatal log line");
        }
        LoggerError::Fatal(message)
    }

    fn emit(&self, event: Event<'_>) -> LoggerResult {
        let now = Utc::now();
        let mut guard = self.lock();
        let Inner { sink, buf } = &mut *guard;

        buf.clear();
        self.format.encode(buf, &self.identity, now, event);

        sink.write_all(buf.as_slice())?;
        sink.flush()?;
        Ok(())
    }

    // The buffer is cleared on every call, so a panic mid-write leaves nothing to repair.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("identity", &self.identity)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
