//! Built-in handlers served by the binary.

use std::thread;
use std::time::Duration;

use axum::http::{header, HeaderValue, Request, StatusCode};
use bytes::Bytes;

use super::client_ip::RemoteAddr;
use super::middleware::HandlerFn;
use super::writer::ResponseWriter;
use crate::routing::Mux;

/// Upper bound for `/stream?n=` so one request cannot pin a blocking thread.
const MAX_TICKS: u32 = 100;

/// The default route table:
///
/// | path        | behaviour                                  |
/// |-------------|--------------------------------------------|
/// | `/healthz`  | `ok`                                       |
/// | `/echo`     | request body back, or `<method> <uri>`     |
/// | `/ip`       | the client address the middleware resolved |
/// | `/status/N` | empty response with status N               |
/// | `/stream`   | `n` flushed lines (`?n=5&delay_ms=0`)      |
/// | `/panic`    | panics                                     |
pub fn default_mux() -> Mux {
    Mux::new()
        .handle("/healthz", HandlerFn(healthz))
        .handle("/echo", HandlerFn(echo))
        .handle("/ip", HandlerFn(ip))
        .handle("/status/", HandlerFn(status))
        .handle("/stream", HandlerFn(stream))
        .handle("/panic", HandlerFn(explode))
}

fn text(w: &mut dyn ResponseWriter) {
    w.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
}

fn healthz(w: &mut dyn ResponseWriter, _request: &mut Request<Bytes>) {
    text(w);
    let _ = w.write_body(b"ok\n");
}

fn echo(w: &mut dyn ResponseWriter, request: &mut Request<Bytes>) {
    if request.body().is_empty() {
        text(w);
        let line = format!("{} {}\n", request.method(), request.uri());
        let _ = w.write_body(line.as_bytes());
        return;
    }
    if let Some(content_type) = request.headers().get(header::CONTENT_TYPE).cloned() {
        w.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    let _ = w.write_body(request.body());
}

fn ip(w: &mut dyn ResponseWriter, request: &mut Request<Bytes>) {
    text(w);
    let addr = RemoteAddr::of(request).unwrap_or("unknown");
    let _ = w.write_body(format!("{}\n", addr).as_bytes());
}

fn status(w: &mut dyn ResponseWriter, request: &mut Request<Bytes>) {
    let code = request
        .uri()
        .path()
        .trim_start_matches("/status/")
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok());
    match code {
        Some(code) => w.set_status(code),
        None => {
            text(w);
            w.set_status(StatusCode::BAD_REQUEST);
            let _ = w.write_body(b"invalid status code\n");
        }
    }
}

fn stream(w: &mut dyn ResponseWriter, request: &mut Request<Bytes>) {
    let ticks = query_param(request, "n").unwrap_or(5).min(MAX_TICKS);
    let delay = Duration::from_millis(u64::from(query_param(request, "delay_ms").unwrap_or(0)));

    text(w);
    for tick in 0..ticks {
        if w.write_body(format!("tick {}\n", tick).as_bytes()).is_err() {
            return;
        }
        if let Some(flusher) = w.flusher() {
            if flusher.flush().is_err() {
                return;
            }
        }
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

fn explode(_w: &mut dyn ResponseWriter, request: &mut Request<Bytes>) {
    panic!("requested panic at {}", request.uri().path());
}

fn query_param(request: &Request<Bytes>, name: &str) -> Option<u32> {
    request.uri().query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == name {
            value.parse().ok()
        } else {
            None
        }
    })
}
