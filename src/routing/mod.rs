//! Request routing.
//!
//! Maps URI paths to the [`Handler`](crate::http::Handler) that serves them.

pub mod mux;

pub use mux::{not_found, Mux};
