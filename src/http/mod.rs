//! HTTP request instrumentation.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum, panic layer, graceful shutdown)
//!     → service.rs (body collection, blocking handler, streaming writer)
//!     → middleware.rs (RequestLog: timing, client IP, ResponseCapture)
//!     → routing::Mux → handlers.rs
//!     → logger (one request record per completed request)
//! ```

pub mod capture;
pub mod client_ip;
pub mod handlers;
pub mod middleware;
pub mod panic;
pub mod server;
pub mod service;
pub mod writer;

pub use capture::ResponseCapture;
pub use client_ip::{client_ip, RemoteAddr, X_FORWARDED_FOR, X_REAL_IP};
pub use middleware::{log_request_middleware, Handler, HandlerFn, RequestLog};
pub use panic::PanicLogger;
pub use server::{HttpServer, ServerError};
pub use service::HandlerService;
pub use writer::{Flush, Recorder, ResponseWriter};
