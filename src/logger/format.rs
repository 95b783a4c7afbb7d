//! Line encoding.
//!
//! Two layouts are supported:
//!
//! ```text
//! plain:     2016/01/12 10:21:38 [svc] 200 GET /path?query=10 (100) 4580
//! key_value: app=svc v=0.1.0 time=2016-01-12T10:21:38.123Z code=200 method=GET uri="/path?query=10" size=100 dur=4580 ip="1.2.3.4"
//! ```
//!
//! Every encoder appends exactly one newline-terminated line to the buffer.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::record::RequestRecord;

/// Maximum number of backtrace bytes written for a panic line.
pub const STACK_SIZE: usize = 2 * 1024;

/// Output layout of every line the logger writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineFormat {
    /// `<timestamp> [<name>] <message>`
    #[default]
    Plain,
    /// `key=value` pairs led by `app`, `v` and `time`.
    KeyValue,
}

/// Returned when a format name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log format '{0}' (expected plain or key_value)")]
pub struct ParseFormatError(pub String);

impl std::str::FromStr for LineFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(LineFormat::Plain),
            "key_value" | "kv" | "keyvalue" => Ok(LineFormat::KeyValue),
            other => Err(ParseFormatError(other.to_owned())),
        }
    }
}

/// Static fields stamped on every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Server name in plain lines, `app` in key=value lines.
    pub name: String,
    /// `v` in key=value lines.
    pub version: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// A semantic event to be rendered as one line.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Info(&'a str),
    Error(&'a str),
    Warning(&'a str),
    Panic { message: &'a str, stack: &'a str },
    Fatal(&'a str),
    Request(&'a RequestRecord),
}

impl LineFormat {
    /// Append `event` to `buf` as a single line.
    ///
    /// `time` is ignored for request events, which carry their own start time.
    pub fn encode(&self, buf: &mut Vec<u8>, identity: &Identity, time: DateTime<Utc>, event: Event<'_>) {
        match self {
            LineFormat::Plain => encode_plain(buf, identity, time, event),
            LineFormat::KeyValue => encode_key_value(buf, identity, time, event),
        }
        buf.push(b'\n');
    }
}

/// `<year>/<month>/<day> <hour>:<min>:<sec> [<name>] `
fn plain_header(buf: &mut Vec<u8>, name: &str, time: DateTime<Utc>) {
    let _ = write!(buf, "{} [{}] ", time.format("%Y/%m/%d %H:%M:%S"), name);
}

fn encode_plain(buf: &mut Vec<u8>, identity: &Identity, time: DateTime<Utc>, event: Event<'_>) {
    match event {
        Event::Request(record) => {
            plain_header(buf, &identity.name, record.started_at);
            let _ = write!(
                buf,
                "{} {} {} ({}) {}",
                record.status,
                record.method,
                record.uri,
                record.size,
                record.duration_micros()
            );
        }
        Event::Info(message) => {
            plain_header(buf, &identity.name, time);
            buf.extend_from_slice(message.as_bytes());
        }
        Event::Error(err) => {
            plain_header(buf, &identity.name, time);
            let _ = write!(buf, "error: {}", err);
        }
        Event::Warning(message) => {
            plain_header(buf, &identity.name, time);
            let _ = write!(buf, "warning: {}", message);
        }
        Event::Fatal(message) => {
            plain_header(buf, &identity.name, time);
            let _ = write!(buf, "fatal: {}", message);
        }
        Event::Panic { message, stack } => {
            plain_header(buf, &identity.name, time);
            let _ = write!(buf, "panic: {}\n{}", message, truncate_stack(stack));
        }
    }
}

fn encode_key_value(buf: &mut Vec<u8>, identity: &Identity, time: DateTime<Utc>, event: Event<'_>) {
    let time = match event {
        Event::Request(record) => record.started_at,
        _ => time,
    };

    buf.extend_from_slice(b"app=");
    write_token(buf, &identity.name);
    buf.extend_from_slice(b" v=");
    write_token(buf, &identity.version);
    let _ = write!(buf, " time={}", time.to_rfc3339_opts(SecondsFormat::Millis, true));

    match event {
        Event::Request(record) => {
            let _ = write!(buf, " code={} method=", record.status);
            write_token(buf, &record.method);
            buf.extend_from_slice(b" uri=");
            write_quoted(buf, &record.uri);
            let _ = write!(buf, " size={} dur={} ip=", record.size, record.duration_micros());
            write_quoted(buf, &record.client_ip);
        }
        Event::Info(message) => {
            buf.extend_from_slice(b" level=info msg=");
            write_quoted(buf, message);
        }
        Event::Error(err) => {
            buf.extend_from_slice(b" level=error err=");
            write_quoted(buf, err);
        }
        Event::Warning(message) => {
            buf.extend_from_slice(b" level=warn msg=");
            write_quoted(buf, message);
        }
        Event::Fatal(message) => {
            buf.extend_from_slice(b" level=fatal msg=");
            write_quoted(buf, message);
        }
        Event::Panic { message, stack } => {
            buf.extend_from_slice(b" level=panic msg=");
            write_quoted(buf, message);
            buf.extend_from_slice(b" stack=");
            write_quoted(buf, truncate_stack(stack));
        }
    }
}

/// Bare value unless it would break key=value parsing.
fn write_token(buf: &mut Vec<u8>, value: &str) {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c <= ' ' || c == '=' || c == '"' || c == '\\' || c.is_control());
    if needs_quotes {
        write_quoted(buf, value);
    } else {
        buf.extend_from_slice(value.as_bytes());
    }
}

fn write_quoted(buf: &mut Vec<u8>, value: &str) {
    buf.push(b'"');
    for c in value.chars() {
        match c {
            '"' => buf.extend_from_slice(b"\\\""),
            '\\' => buf.extend_from_slice(b"\\\\"),
            '\n' => buf.extend_from_slice(b"\\n"),
            '\r' => buf.extend_from_slice(b"\\r"),
            '\t' => buf.extend_from_slice(b"\\t"),
            c if c.is_control() => {
                let _ = write!(buf, "\\u{{{:04x}}}", c as u32);
            }
            c => {
                let mut utf8 = [0u8; 4];
                buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
    buf.push(b'"');
}

fn truncate_stack(stack: &str) -> &str {
    if stack.len() <= STACK_SIZE {
        return stack;
    }
    let mut end = STACK_SIZE;
    while !stack.is_char_boundary(end) {
        end -= 1;
    }
    &stack[..end]
}
