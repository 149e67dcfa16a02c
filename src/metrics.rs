//! Phase-organized metrics for the census pipeline
//!
//! Each phase owns a small struct of recording helpers. All names follow
//! `census_{phase}_{metric}` with a `_total` suffix on counters.

use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("census_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("census_", $phase, "_", $name)
    };
}

/// Install the Prometheus recorder with an HTTP listener. Idempotent.
///
/// Without an address no recorder is installed and every metric call is a no-op.
pub fn init_metrics(addr: Option<SocketAddr>) {
    let Some(addr) = addr else {
        info!("Metrics address not configured, metrics disabled");
        return;
    };
    INIT.call_once(|| {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
        match builder.install() {
            Ok(()) => {
                info!("Prometheus exporter listening on http://{}/metrics", addr);
                register_all_metrics();
            }
            Err(e) => warn!("Failed to install Prometheus exporter: {}", e),
        }
    });
}

fn register_all_metrics() {
    IngestMetrics::register_metrics();
    QuoteMetrics::register_metrics();
    AdapterMetrics::register_metrics();
}

/// Ingestion phase: parent creation, parsing, batch commits
pub struct IngestMetrics;

impl IngestMetrics {
    pub fn record_census_created() {
        ::metrics::counter!(phase_metric!(counter, "ingest", "census_created")).increment(1);
    }

    pub fn record_rows_parsed(rows: usize) {
        ::metrics::histogram!(phase_metric!(histogram, "ingest", "rows_per_census")).record(rows as f64);
    }

    pub fn record_batch_committed(size: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "ingest", "batches_committed")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "ingest", "lines_committed")).increment(size as u64);
        ::metrics::histogram!(phase_metric!(histogram, "ingest", "commit_duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_failure(stage: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "ingest", "failures"), "stage" => stage).increment(1);
    }

    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "ingest", "census_created"));
        let _ = ::metrics::counter!(phase_metric!(counter, "ingest", "batches_committed"));
        let _ = ::metrics::counter!(phase_metric!(counter, "ingest", "lines_committed"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "ingest", "rows_per_census"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "ingest", "commit_duration_seconds"));
    }
}

pub struct QuoteMetrics;

impl QuoteMetrics {
    pub fn record_quote_computed(rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "quote", "computed")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "quote", "rows_quoted")).record(rows as f64);
    }

    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "quote", "computed"));
        let _ = ::metrics::histogram!(phase_metric!(histogram, "quote", "rows_quoted"));
    }
}

/// Rendering and chat delivery
pub struct AdapterMetrics;

impl AdapterMetrics {
    pub fn record_delivered(artifact: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "adapter", "delivered"), "artifact" => artifact).increment(1);
    }

    pub fn record_failed(artifact: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "adapter", "failed"), "artifact" => artifact).increment(1);
    }

    fn register_metrics() {
        let _ = ::metrics::counter!(phase_metric!(counter, "adapter", "delivered"));
        let _ = ::metrics::counter!(phase_metric!(counter, "adapter", "failed"));
    }
}
