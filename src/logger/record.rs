//! The request record handed from the instrumentation layer to the logger.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// One completed request/response exchange.
///
/// Assembled once per request after the downstream handler returns and
/// consumed immediately by [`Logger::log_request`](super::Logger::log_request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// Wall-clock time the request entered the middleware.
    pub started_at: DateTime<Utc>,
    /// HTTP method (GET, POST, ...).
    pub method: String,
    /// Request URI including the query string.
    pub uri: String,
    /// Resolved client address, empty when unknown.
    pub client_ip: String,
    /// Response status code.
    pub status: u16,
    /// Response body bytes actually written.
    pub size: u64,
    /// Time from request start until the handler returned.
    pub duration: Duration,
}

impl RequestRecord {
    /// Elapsed duration in whole microseconds.
    pub fn duration_micros(&self) -> u128 {
        self.duration.as_micros()
    }
}
