//! Generative-AI gateway (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ rate limiter ──▶ turnstile gate
//!                                                          │
//!                                                          ▼
//!     Client Response                                  validation
//!     ◀────────────── error envelope ◀── upstream ◀────────┘
//!                                       (Pollinations)
//!
//!     Cross-cutting: config, health probes, observability,
//!                    maintenance sweeper, admin API, shutdown
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use genai_gateway::admin::setup_admin_router;
use genai_gateway::config::{load_config, load_from_env};
use genai_gateway::lifecycle::signals::spawn_signal_handler;
use genai_gateway::lifecycle::{Maintenance, Shutdown};
use genai_gateway::observability::{logging, metrics};
use genai_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "genai-gateway")]
#[command(about = "Rate-limited, verified gateway to generative AI APIs", long_about = None)]
struct Args {
    /// TOML configuration file; defaults plus environment when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level, config.environment)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        bind_address = %config.listener.bind_address,
        rate_limit = config.rate_limit.max_requests,
        window_ms = config.rate_limit.window_ms,
        request_timeout_secs = config.timeouts.request_secs,
        "genai-gateway starting"
    );

    if !config.turnstile.is_configured() && !config.turnstile.skip {
        tracing::warn!("Turnstile keys are not configured; gated routes will reject requests");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let admin = config.admin.clone();
    let cleanup_interval = Duration::from_secs(config.rate_limit.cleanup_interval_secs);
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;
    let state = server.state().clone();

    let maintenance = Maintenance::new(
        state.limiter.clone(),
        state.error_cache.clone(),
        cleanup_interval,
    );
    tokio::spawn(maintenance.run(shutdown.subscribe()));

    if admin.enabled {
        let admin_listener = TcpListener::bind(&admin.bind_address).await?;
        tracing::info!(address = %admin.bind_address, "Admin API listening");
        let app = setup_admin_router(state);
        let stop = shutdown.signalled();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(admin_listener, app)
                .with_graceful_shutdown(stop)
                .await
            {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        });
    }

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
