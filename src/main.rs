//! Service Forwarder
//!
//! A gateway that forwards browser-facing API calls to backend services.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing::RouteTable ──▶ forward::Forwarder ──▶ Backend
//!                      (request ID,     (mount match, URL        (headers, JSON body,      Service
//!                       tracing)         composition)             deadline)
//!     Client Response
//!     ◀────────────── relayed status + JSON body | {detail, error[, targetUrl]}
//!
//!     Cross-cutting: config (TOML + env), observability (tracing, Prometheus),
//!                    resilience (deadlines), lifecycle (signals, graceful shutdown)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use service_forwarder::config;
use service_forwarder::lifecycle::{spawn_signal_listener, Shutdown};
use service_forwarder::observability::{logging, metrics};
use service_forwarder::HttpServer;

#[derive(Parser)]
#[command(name = "service-forwarder")]
#[command(about = "HTTP gateway forwarding API calls to backend services", long_about = None)]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long, env = "FORWARDER_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address override (takes precedence over file and environment)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = config::load_from_process(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-forwarder starting");
    tracing::info!(
        mode = %config.mode(),
        bind_address = %config.listener.bind_address,
        default_timeout_ms = config.timeouts.default_ms,
        services = config.services.len(),
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
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.wait()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
