//! Self-Recursive Fibonacci Service
//!
//! A network-recursive computation service built with Tokio and Axum:
//! `fib(i)` is answered by calling `fib(i-1)` and `fib(i-2)` on this same
//! service over HTTP, with the causal context carried across every hop.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌────────────────────────────────────────────────┐
//!                        │                  FIB SERVICE                    │
//!                        │                                                 │
//!   GET /fib?i=N ────────┼─▶ http/server ──▶ http/fanout                  │
//!                        │                     │    │                      │
//!                        │        two concurrent sub-calls                 │
//!                        │                     │    │                      │
//!   GET /fibinternal ◀───┼─────────────────────┘    └──────────────▶ ...  │
//!     (loops back in)    │                                                 │
//!                        │  ┌──────────────────────────────────────────┐  │
//!                        │  │          Cross-Cutting Concerns           │  │
//!                        │  │  config   lifecycle   observability       │  │
//!                        │  │  (TOML)   (shutdown)  (spans/metrics/log) │  │
//!                        │  └──────────────────────────────────────────┘  │
//!                        │  ┌──────────────────────────────────────────┐  │
//!                        │  │ sampler: memory / disk / task gauges      │  │
//!                        │  │ every interval, for the process lifetime  │  │
//!                        │  └──────────────────────────────────────────┘  │
//!                        └────────────────────────────────────────────────┘
//! ```

use tokio::net::TcpListener;

use fib_service::config;
use fib_service::http::HttpServer;
use fib_service::lifecycle::{signals, Shutdown};
use fib_service::observability::{logging, metrics};
use fib_service::sampler::ResourceSampler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::resolve_config()?;

    logging::init(&config.observability.log_level);

    tracing::info!("fib-service v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        sampler_interval_secs = config.sampler.interval_secs,
        "Configuration loaded"
    );
    if config.telemetry.access_token.is_empty() {
        tracing::warn!("No trace backend access token configured");
    }

    // Bind before anything else so startup failures surface immediately
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let sampler_shutdown = shutdown.subscribe();

    let sampler = ResourceSampler::new(config.sampler.clone());
    tokio::spawn(sampler.run(sampler_shutdown));
    tokio::spawn(signals::watch(shutdown));

    let server = HttpServer::new(config);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
