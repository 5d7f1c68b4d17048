//! dispatch-core server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────────▶ http::server (request ID, trace, timeout)
//!                              │
//!                              ▼
//!                        dispatch::Router ──── routing (match + variables)
//!                              │
//!                              ▼
//!                        pipeline::RouteHandler
//!                        middleware chain → controller chain
//!                              │              (built by container)
//!     Client Response          ▼
//!     ◀───────────────── ServerResponse
//!
//!     config (TOML, hot reload) · observability · lifecycle
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use dispatch_core::components::register_builtins;
use dispatch_core::config::{load_config, AppConfig, ConfigWatcher};
use dispatch_core::container::Container;
use dispatch_core::dispatch::Router;
use dispatch_core::http::HttpServer;
use dispatch_core::lifecycle::{wait_for_signal, Shutdown};
use dispatch_core::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "dispatch-core", version, about = "Route-dispatching HTTP server")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and route table, then exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dispatch-core starting");

    let mut container = Container::new();
    register_builtins(&mut container);
    let router = Arc::new(Router::with_config(Arc::new(container), config.dispatch.clone()));
    let routes = router.load_routes(&config.routes)?;

    tracing::info!(
        bind_address = %config.server.bind_address,
        routes,
        request_timeout_secs = config.server.request_timeout_secs,
        "Configuration loaded"
    );

    if cli.check {
        for path in router.list_routes() {
            println!("{path}");
        }
        println!("configuration OK ({routes} routes)");
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // The watcher handle must outlive the server.
    let (route_updates, _watcher) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path, router.clone());
            (updates, Some(watcher.run()?))
        }
        None => (tokio::sync::mpsc::unbounded_channel().1, None),
    };

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(config, router);
    server.run(listener, route_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
