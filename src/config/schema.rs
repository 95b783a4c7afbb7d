//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files and
//! default every field, so an empty file is a valid configuration.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logger::{Identity, LineFormat, Logger, Sink};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Access log settings.
    pub logger: LoggerConfig,

    /// Request logging middleware settings.
    pub middleware: MiddlewareConfig,

    /// Diagnostic tracing settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Where access log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Access log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Line format.
    pub format: LineFormat,

    /// Server name in plain lines; `app` field in key=value lines.
    pub name: String,

    /// `v` field in key=value lines.
    pub version: String,

    /// Destination of the access log.
    pub sink: SinkKind,

    /// Log file, required when `sink = "file"`.
    pub file_path: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LineFormat::Plain,
            name: "svc".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            sink: SinkKind::Stdout,
            file_path: None,
        }
    }
}

impl LoggerConfig {
    /// Open the configured sink and build a [`Logger`] on it.
    pub fn build(&self) -> io::Result<Logger> {
        let sink = match self.sink {
            SinkKind::Stdout => Sink::stdout(),
            SinkKind::Stderr => Sink::stderr(),
            SinkKind::File => {
                let path = self.file_path.as_deref().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "logger.file_path is not set")
                })?;
                Sink::file(path)?
            }
        };
        Ok(Logger::new(
            Identity::new(self.name.clone(), self.version.clone()),
            self.format,
            sink,
        ))
    }
}

/// Request logging middleware configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Resolve the client address from `X-Forwarded-For` / `X-Real-IP`.
    pub trust_proxy_headers: bool,

    /// Largest request body handed to handlers, in bytes.
    pub max_body_size: usize,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            trust_proxy_headers: true,
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Diagnostic tracing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
