//! Registration metrics.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `rsvp_registrations_total{operation, outcome}` - register/cancel results
//!   (`ok`, `not_found`, `capacity_exceeded`, `already_registered`,
//!   `unknown_user`, `transient`, `error`)
//! - `rsvp_registration_conflicts_total` - conditional writes that lost a race
//!   and were retried

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Errors raised while installing the exporter.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// The exporter could not be built or its listener could not bind.
    #[error("failed to install Prometheus exporter: {0}")]
    Install(String),
}

/// Register descriptions for every metric this service records.
///
/// Call once at startup, after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "rsvp_registrations_total",
        "Register and cancel requests by operation and outcome"
    );
    describe_counter!(
        "rsvp_registration_conflicts_total",
        "Registration writes rejected because the seat ledger moved"
    );

    tracing::debug!("Registration metrics registered");
}

/// Install the Prometheus recorder with a scrape endpoint on `addr`.
///
/// Without an installed recorder the `metrics` macros are no-ops.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a recorder is already installed or
/// the listener cannot bind.
pub fn install_prometheus(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    tracing::info!(%addr, "Prometheus metrics available at http://{addr}/metrics");
    Ok(())
}
