//! request-logger
//!
//! An HTTP service whose every request is written to a structured access log.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::service ──▶ RequestLog ──▶ routing::Mux ──▶ handler
//!                     (axum, panic      (body, blocking    (timing,
//!                      recovery)         pool, streaming)   client IP,
//!                                                           capture)
//!                                                              │
//!                                                              ▼
//!                                                           logger ──▶ stdout / stderr / file
//! ```

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use request_logger::config::{read_config, validate_config, ConfigError, ServiceConfig};
use request_logger::http::HttpServer;
use request_logger::lifecycle::{wait_for_signal, Shutdown};
use request_logger::logger::{global, LineFormat};
use request_logger::observability::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "request-logger", version, about = "HTTP service with structured request logging")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding `listener.bind_address`.
    #[arg(long)]
    bind: Option<String>,

    /// Access log format: `plain` or `key_value`.
    #[arg(long)]
    format: Option<LineFormat>,

    /// Server name stamped on every access log line.
    #[arg(long)]
    name: Option<String>,
}

impl Cli {
    fn load(&self) -> Result<ServiceConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(format) = self.format {
            config.logger.format = format;
        }
        if let Some(name) = &self.name {
            config.logger.name = name.clone();
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    init_tracing(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "request-logger starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        format = ?config.logger.format,
        sink = ?config.logger.sink,
        "Configuration loaded"
    );

    let logger = Arc::new(config.logger.build()?);
    global::init(logger.clone());

    let server = HttpServer::new(config, logger.clone());
    let listener = match server.bind().await {
        Ok(listener) => listener,
        Err(e) => return Err(logger.fatal(e).into()),
    };
    global::info(&format!("listening on {}", listener.local_addr()?));

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let signal_task = tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(name) => tracing::info!(signal = name, "shutdown requested"),
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for shutdown signals");
                // Dropping the coordinator would stop the server.
                std::future::pending::<()>().await;
            }
        }
        shutdown.trigger();
    });

    if let Err(e) = server.run(listener, signal).await {
        return Err(logger.fatal(e).into());
    }
    signal_task.abort();

    global::info("shutdown complete");
    Ok(())
}
