//! Path multiplexer.
//!
//! # Design Decisions
//! - A pattern ending in `/` matches its whole subtree; any other pattern
//!   matches only that exact path
//! - The longest matching pattern wins
//! - Unmatched paths get a plain-text 404

use std::sync::Arc;

use axum::http::{header, HeaderValue, Request, StatusCode};
use bytes::Bytes;

use crate::http::{Handler, ResponseWriter};

#[derive(Clone)]
struct Route {
    pattern: String,
    handler: Arc<dyn Handler>,
}

impl Route {
    fn matches(&self, path: &str) -> bool {
        if self.pattern.ends_with('/') {
            path.starts_with(&self.pattern)
        } else {
            path == self.pattern
        }
    }
}

/// Dispatches requests to handlers by URI path.
#[derive(Clone, Default)]
pub struct Mux {
    // Sorted longest pattern first.
    routes: Vec<Route>,
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `pattern`, replacing any earlier registration.
    pub fn handle(mut self, pattern: impl Into<String>, handler: impl Handler + 'static) -> Self {
        let pattern = pattern.into();
        self.routes.retain(|route| route.pattern != pattern);
        self.routes.push(Route {
            pattern,
            handler: Arc::new(handler),
        });
        self.routes
            .sort_by(|a, b| b.pattern.len().cmp(&a.pattern.len()));
        self
    }

    /// Registered patterns, longest first.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.pattern.as_str())
    }

    fn lookup(&self, path: &str) -> Option<&Arc<dyn Handler>> {
        self.routes
            .iter()
            .find(|route| route.matches(path))
            .map(|route| &route.handler)
    }
}

impl Handler for Mux {
    fn serve_http(&self, w: &mut dyn ResponseWriter, request: &mut Request<Bytes>) {
        let path = request.uri().path().to_owned();
        match self.lookup(&path) {
            Some(handler) => handler.serve_http(w, request),
            None => not_found(w),
        }
    }
}

/// Plain-text 404 response.
pub fn not_found(w: &mut dyn ResponseWriter) {
    w.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    w.set_status(StatusCode::NOT_FOUND);
    let _ = w.write_body(b"404 page not found\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HandlerFn, Recorder};

    fn reply(text: &'static str) -> impl Handler {
        HandlerFn(move |w: &mut dyn ResponseWriter, _: &mut Request<Bytes>| {
            let _ = w.write_body(text.as_bytes());
        })
    }

    fn serve(mux: &Mux, path: &str) -> Recorder {
        let mut rec = Recorder::new();
        let mut request = Request::builder().uri(path).body(Bytes::new()).unwrap();
        mux.serve_http(&mut rec, &mut request);
        rec
    }

    #[test]
    fn test_exact_and_subtree_patterns() {
        let mux = Mux::new()
            .handle("/", reply("root"))
            .handle("/echo", reply("echo"))
            .handle("/status/", reply("status"));

        assert_eq!(serve(&mux, "/echo").body(), b"echo");
        assert_eq!(serve(&mux, "/echo/extra").body(), b"root");
        assert_eq!(serve(&mux, "/status/418").body(), b"status");
        assert_eq!(serve(&mux, "/anything").body(), b"root");
    }

    #[test]
    fn test_unmatched_path_is_404() {
        let mux = Mux::new().handle("/only", reply("only"));
        let rec = serve(&mux, "/other");
        assert_eq!(rec.status(), StatusCode::NOT_FOUND);
        assert_eq!(rec.body(), b"404 page not found\n");
    }

    #[test]
    fn test_reregistering_replaces() {
        let mux = Mux::new()
            .handle("/a", reply("first"))
            .handle("/a", reply("second"));
        assert_eq!(mux.patterns().count(), 1);
        assert_eq!(serve(&mux, "/a").body(), b"second");
    }
}
