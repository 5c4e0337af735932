//! Ops dashboard request gate.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                 REQUEST GATE                 │
//!                     │                                              │
//!   Client Request    │  ┌────────┐   ┌──────────┐   ┌───────────┐   │
//!   ──────────────────┼─▶│ trace  │──▶│   gate   │──▶│   proxy   │───┼──▶ Dashboard
//!                     │  │ req-id │   │ rate+key │   │  handler  │   │    upstream
//!                     │  └────────┘   └────┬─────┘   └───────────┘   │
//!   ◀── 429 / 401 ────┼────────────────────┘                         │
//!                     │                                              │
//!                     │  ┌────────────┐  ┌────────┐  ┌────────────┐  │
//!                     │  │ rate pruner│  │ admin  │  │  metrics   │  │
//!                     │  └────────────┘  └────────┘  └────────────┘  │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ops_gate::config::load_config;
use ops_gate::http::HttpServer;
use ops_gate::lifecycle::{signals, Shutdown};
use ops_gate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "ops-gate")]
#[command(about = "Rate limiting and API key gate for the ops dashboard", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability);

    tracing::info!("ops-gate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        window_secs = config.gate.window_secs,
        max_requests = config.gate.max_requests,
        public_routes = ?config.gate.public_routes,
        protected_routes = ?config.gate.protected_routes,
        "Configuration loaded"
    );

    if config.gate.api_key.is_none() {
        tracing::warn!("DASHBOARD_API_KEY not set, protected routes are open");
    }

    if config.observability.metrics_enabled {
        // Validation already checked the address.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(&shutdown);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
