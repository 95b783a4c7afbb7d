//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use request_logger::config::ServiceConfig;
use request_logger::http::HttpServer;
use request_logger::lifecycle::Shutdown;
use request_logger::logger::{Identity, LineFormat, Logger, SharedBuffer, Sink};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A logger named `svc`, version `0.1.0`, writing into a fresh buffer.
pub fn buffered_logger(format: LineFormat) -> (Arc<Logger>, SharedBuffer) {
    let buffer = SharedBuffer::new();
    let logger = Logger::new(Identity::new("svc", "0.1.0"), format, Sink::buffer(&buffer));
    (Arc::new(logger), buffer)
}

/// A running server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.task).await;
    }
}

/// Serve the default route table on `127.0.0.1:0`.
pub async fn start_server(mut config: ServiceConfig, logger: Arc<Logger>) -> TestServer {
    config.listener.bind_address = "127.0.0.1:0".into();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let server = HttpServer::new(config, logger);
    let task = tokio::spawn(async move {
        server.run(listener, signal).await.unwrap();
    });

    TestServer { addr, shutdown, task }
}

/// Poll `buffer` until it holds at least `count` lines.
///
/// Request records are written after the response body is handed off, so a
/// client can see the response before the line lands.
pub async fn wait_for_lines(buffer: &SharedBuffer, count: usize) -> Vec<String> {
    for _ in 0..200 {
        let lines = buffer.lines();
        if lines.len() >= count {
            return lines;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} log lines, got: {:?}", count, buffer.lines());
}
