//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Access log (one line per request) → crate::logger
//! Operational events (startup, shutdown, sink failures) → logging.rs (tracing)
//! ```
//!
//! # Design Decisions
//! - The two streams never mix: tracing output goes to stderr through the
//!   fmt layer, the access log goes wherever its sink points

pub mod logging;

pub use logging::init_tracing;
