//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum router around the logged handler chain
//! - Catch handler panics and report them through the logger
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::handlers::default_mux;
use crate::http::middleware::{Handler, RequestLog};
use crate::http::panic::PanicLogger;
use crate::http::service::HandlerService;
use crate::lifecycle::ShutdownSignal;
use crate::logger::Logger;

/// Errors from binding or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// HTTP server whose every request is written to the access log.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Serve the built-in route table.
    pub fn new(config: ServiceConfig, logger: Arc<Logger>) -> Self {
        Self::with_handler(config, logger, default_mux())
    }

    /// Serve `handler` behind the request logging middleware.
    pub fn with_handler<H: Handler + 'static>(config: ServiceConfig, logger: Arc<Logger>, handler: H) -> Self {
        let router = Self::build_router(&config, logger, handler);
        Self { router, config }
    }

    fn build_router<H: Handler + 'static>(config: &ServiceConfig, logger: Arc<Logger>, handler: H) -> Router {
        let panic_logger = PanicLogger::new(logger.clone());
        let logged = RequestLog::new(logger, handler)
            .trust_proxy_headers(config.middleware.trust_proxy_headers);
        let service = HandlerService::new(logged, config.middleware.max_body_size)
            .with_panic_logger(panic_logger.clone());

        Router::new()
            .fallback_service(service)
            .layer(panic_logger.layer())
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.listener.bind_address.clone();
        TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind { address, source })
    }

    /// Serve connections from `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for in-process testing with `tower::ServiceExt`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
