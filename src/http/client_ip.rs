//! Client address resolution from proxy headers.

use axum::http::{header::HeaderName, HeaderMap, Request};

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub static X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Transport-level peer address of a request, stored as a request extension.
///
/// The logging middleware may replace it with the address resolved by
/// [`client_ip`] before the handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddr(pub String);

impl RemoteAddr {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The remote address carried by `request`, if any.
    pub fn of<B>(request: &Request<B>) -> Option<&str> {
        request.extensions().get::<RemoteAddr>().map(RemoteAddr::as_str)
    }
}

/// Best-effort originating client address.
///
/// Priority:
/// 1. `X-Forwarded-For`: the text before the first `", "`, or the whole value
/// 2. `X-Real-IP`: the whole value
///
/// Returns `None` when neither header carries a non-empty, valid value, in
/// which case the caller keeps the transport address.
pub fn client_ip(headers: &HeaderMap) -> Option<&str> {
    if let Some(forwarded) = header_value(headers, &X_FORWARDED_FOR) {
        return Some(match forwarded.split_once(", ") {
            Some((first, _)) => first,
            None => forwarded,
        });
    }
    header_value(headers, &X_REAL_IP)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}
