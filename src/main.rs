//! sync-gateway
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   Client ──────▶│ http::server ──forward──▶ upstream           │──▶ Backend
//!                 │      │                      │ 202 + id        │
//!                 │      ▼                      ▼                 │
//!   Client ◀──────│ park middleware ◀── rendezvous engine         │
//!  200 / 202      │                          ▲                    │
//!                 │               POST /messages (ingest)         │◀── Result
//!                 └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use sync_gateway::config::{load_config, GatewayConfig};
use sync_gateway::lifecycle::{wait_for_signal, Shutdown};
use sync_gateway::observability::{logging, metrics};
use sync_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "sync-gateway")]
#[command(about = "Holds accepted requests open until their result arrives", long_about = None)]
struct Args {
    /// Path to a TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sync-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        timeout_ms = config.rendezvous.timeout_ms,
        correlation_header = %config.rendezvous.correlation_header,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
