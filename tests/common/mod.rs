//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use sync_gateway::config::GatewayConfig;
use sync_gateway::http::HttpServer;
use sync_gateway::lifecycle::Shutdown;
use sync_gateway::{CorrelationId, RendezvousEngine};

/// A running gateway under test.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub engine: RendezvousEngine<serde_json::Value>,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a mock asynchronous backend.
///
/// - `/work` answers `202 Accepted` with a fresh id in the `CorrelationId`
///   header (simple, unhyphenated form) and reports the id on the channel.
/// - `/no-header` answers `202 Accepted` without an id.
/// - `/slow` answers `200 OK` after five seconds.
/// - anything else answers `200 OK` with body `done`.
pub async fn start_mock_backend() -> (SocketAddr, mpsc::UnboundedReceiver<CorrelationId>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (ids_tx, ids_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let ids_tx = ids_tx.clone();
                    tokio::spawn(async move {
                        let path = read_request_path(&mut socket).await;
                        let response = match path.as_str() {
                            "/work" => {
                                let id = CorrelationId::new();
                                let _ = ids_tx.send(id);
                                raw_response(
                                    "202 Accepted",
                                    &format!("CorrelationId: {}\r\n", id.as_uuid().simple()),
                                    "queued",
                                )
                            }
                            "/no-header" => raw_response("202 Accepted", "", "queued"),
                            "/slow" => {
                                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                                raw_response("200 OK", "", "late")
                            }
                            _ => raw_response("200 OK", "", "done"),
                        };
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, ids_rx)
}

async fn read_request_path(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf)
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string()
}

fn raw_response(status: &str, headers: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        headers,
        body.len(),
        body
    )
}

/// A config pointing at `upstream` with a short rendezvous timeout.
pub fn test_config(upstream: SocketAddr, timeout_ms: u64) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.address = upstream.to_string();
    config.rendezvous.timeout_ms = timeout_ms;
    config
}

/// Bind and run a gateway in the background.
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let engine = server.engine();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway {
        addr,
        engine,
        shutdown,
    }
}

/// A reqwest client that never pools or proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
