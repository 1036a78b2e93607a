//! HTTP load balancer.
//!
//! ```text
//!     Client Request                 ┌──────────────────────────────────────┐
//!     ──────────────────────────────▶│ http server (axum + tower-http)      │
//!                                    │   → dispatcher (attempt limit)       │
//!                                    │   → backend pool (rr / least-conn)   │
//!                                    │   → retry policy (backoff, failover) │
//!     Client Response                │   → forwarder (hyper client)         │──▶ Backend
//!     ◀──────────────────────────────│                                      │◀── Servers
//!                                    │ health scheduler (periodic probes)   │
//!                                    └──────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use lb_proxy::config::{resolve_config, Overrides, Strategy};
use lb_proxy::lifecycle::signals::spawn_signal_handler;
use lb_proxy::observability::{logging, metrics};
use lb_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "lb-proxy")]
#[command(about = "HTTP load balancer with health checks and failover", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Comma-separated backend URLs
    #[arg(short, long)]
    backends: Option<String>,

    /// Selection strategy: round-robin or least-connections
    #[arg(short, long)]
    strategy: Option<Strategy>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = Overrides {
        port: cli.port,
        backends: cli.backends,
        strategy: cli.strategy,
        log_level: cli.log_level,
    };
    let config = match resolve_config(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("lb-proxy: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        backends = config.backends.len(),
        strategy = %config.strategy,
        health_checks = config.health_check.enabled,
        retry_limit = config.retries.retry_limit,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(config.bind_address()).await?;

    let shutdown = Arc::new(Shutdown::new());
    let _signals = spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
