use std::net::SocketAddr;
use std::time::Instant;

use crate::engine::EngineError;

// ── RED metrics (operation-driven) ──────────────────────────────

/// Counter: engine operations executed. Labels: op, status.
pub const OPERATIONS_TOTAL: &str = "labstat_operations_total";

/// Histogram: operation latency in seconds. Labels: op.
pub const OPERATION_DURATION_SECONDS: &str = "labstat_operation_duration_seconds";

// ── Domain metrics ──────────────────────────────────────────────

/// Counter: allocation proposals rejected for sharing a weekday.
pub const ALLOCATION_CONFLICTS_TOTAL: &str = "labstat_allocation_conflicts_total";

/// Counter: deletes refused because of dependents. Labels: entity.
pub const DELETES_BLOCKED_TOTAL: &str = "labstat_deletes_blocked_total";

/// Histogram: WAL append + fsync duration in seconds.
pub const WAL_APPEND_DURATION_SECONDS: &str = "labstat_wal_append_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
/// Logs go to stderr so stdout stays clean for command output.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Status label for an operation outcome.
pub fn status_label(err: Option<&EngineError>) -> &'static str {
    err.map_or("ok", EngineError::label)
}

/// Record count and latency of one finished operation.
pub fn record(op: &'static str, err: Option<&EngineError>, start: Instant) {
    metrics::counter!(OPERATIONS_TOTAL, "op" => op, "status" => status_label(err)).increment(1);
    metrics::histogram!(OPERATION_DURATION_SECONDS, "op" => op)
        .record(start.elapsed().as_secs_f64());
}
