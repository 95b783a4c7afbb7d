//! Structured request logging for HTTP services.
//!
//! A [`Logger`] writes timestamped, tagged lines in a plain or key=value
//! layout. [`RequestLog`] wraps any [`Handler`], measures each request and
//! writes one access log line per completed request.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod logger;
pub mod observability;
pub mod routing;

pub use config::ServiceConfig;
pub use http::{log_request_middleware, Handler, HttpServer, RequestLog, ResponseCapture, ResponseWriter};
pub use lifecycle::Shutdown;
pub use logger::{LineFormat, Logger, RequestRecord};
