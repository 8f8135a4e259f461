//! Prometheus metrics for admission decisions.
//!
//! - `slot_booking_admissions_total{outcome}`: decisions by outcome label
//!   (`accepted`, `slot_full`, `store_busy`, ...)
//! - `slot_booking_admission_retries_total`: attempts rerun after contention
//! - `slot_booking_admission_duration_seconds`: end-to-end decision latency
//!
//! # Example
//!
//! ```rust,no_run
//! use slot_booking_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use slot_booking_core::{Admission, AdmissionError};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

const ADMISSIONS_TOTAL: &str = "slot_booking_admissions_total";
const RETRIES_TOTAL: &str = "slot_booking_admission_retries_total";
const DURATION_SECONDS: &str = "slot_booking_admission_duration_seconds";

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus scrape endpoint.
///
/// Serves `/metrics` on its own listener, separate from the HTTP API.
#[derive(Debug, Clone, Copy)]
pub struct MetricsServer {
    addr: SocketAddr,
}

impl MetricsServer {
    /// Create a new metrics server bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Address the exporter listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Install the global recorder and start the HTTP listener.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or a recorder is already
    /// installed.
    pub fn start(&self) -> Result<(), MetricsError> {
        exporter_builder()?
            .with_http_listener(self.addr)
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;
        register_metrics();
        tracing::info!(addr = %self.addr, "Metrics available at http://{}/metrics", self.addr);
        Ok(())
    }
}

fn exporter_builder() -> Result<PrometheusBuilder, MetricsError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )
        .map_err(|e| MetricsError::Build(e.to_string()))
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        ADMISSIONS_TOTAL,
        "Admission decisions by outcome"
    );
    describe_counter!(
        RETRIES_TOTAL,
        "Admission attempts rerun after store contention"
    );
    describe_histogram!(
        DURATION_SECONDS,
        "Time taken to reach an admission decision"
    );
}

/// Admission metrics recorder.
pub struct AdmissionMetrics;

impl AdmissionMetrics {
    /// Record a finished admission decision.
    pub fn record(result: &Result<Admission, AdmissionError>, duration: Duration) {
        let outcome = match result {
            Ok(admission) => admission.label(),
            Err(AdmissionError::Transient { .. }) => "store_busy",
            Err(AdmissionError::Store(_)) => "store_error",
        };
        counter!(ADMISSIONS_TOTAL, "outcome" => outcome).increment(1);
        histogram!(DURATION_SECONDS).record(duration.as_secs_f64());
    }

    /// Record an attempt rerun after contention.
    pub fn record_retry() {
        counter!(RETRIES_TOTAL).increment(1);
    }
}
