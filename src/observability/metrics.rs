//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by route, status
//! - `dispatch_request_duration_seconds` (histogram): dispatch latency by route
//! - `dispatch_handler_failures_total` (counter): degraded requests by route
//! - `dispatch_routes_registered` (gauge): size of the route table
//!
//! # Design Decisions
//! - Routes are labelled by pattern, never by concrete path (bounded cardinality)
//! - Recording is a no-op until a recorder is installed

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_dispatch(route: &str, status: u16, started: Instant) {
    let route = route.to_string();
    counter!("dispatch_requests_total", "route" => route.clone(), "status" => status.to_string()).increment(1);
    histogram!("dispatch_request_duration_seconds", "route" => route).record(started.elapsed().as_secs_f64());
}

/// Record a request whose handler failed or panicked.
pub fn record_handler_failure(route: &str) {
    counter!("dispatch_handler_failures_total", "route" => route.to_string()).increment(1);
}

pub fn record_route_count(count: usize) {
    gauge!("dispatch_routes_registered").set(count as f64);
}
