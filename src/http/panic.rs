//! Panic recovery.
//!
//! Handlers run without a safety net inside the logging middleware; a panic
//! unwinds to this layer, which writes a `panic:` line with a backtrace through
//! the [`Logger`] and answers 500.

use std::any::Any;
use std::backtrace::Backtrace;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

use crate::logger::Logger;

/// Reports recovered panics through a [`Logger`].
#[derive(Clone, Debug)]
pub struct PanicLogger {
    logger: Arc<Logger>,
}

impl PanicLogger {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    /// A tower layer that catches panics and reports them here.
    pub fn layer(&self) -> CatchPanicLayer<PanicLogger> {
        CatchPanicLayer::custom(self.clone())
    }

    /// Log a panic payload together with the current backtrace.
    pub fn report(&self, payload: &(dyn Any + Send)) {
        let message = panic_message(payload);
        let stack = Backtrace::force_capture().to_string();
        if let Err(e) = self.logger.log_panic(message, &stack) {
            tracing::error!(error = %e, panic = %message, "failed to write panic log line");
        }
    }
}

impl ResponseForPanic for PanicLogger {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Self::ResponseBody> {
        self.report(err.as_ref());

        let mut response = Response::new(Body::from("Internal Server Error\n"));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// The message carried by a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{Identity, LineFormat, SharedBuffer, Sink};

    fn panic_logger() -> (PanicLogger, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let logger = Logger::new(Identity::new("svc", ""), LineFormat::Plain, Sink::buffer(&buffer));
        (PanicLogger::new(Arc::new(logger)), buffer)
    }

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_response_for_panic_logs_and_answers_500() {
        let (mut reporter, buffer) = panic_logger();
        let response = reporter.response_for_panic(Box::new("message"));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let out = buffer.contents();
        let rest = out.split_once("[svc] ").unwrap().1;
        assert!(rest.starts_with("panic: message\n"));
        assert!(rest.len() > "panic: message\n".len());
    }
}
