//! Metrics collection and exposition.
//!
//! # Metrics
//! - `notifier_messages_total` (counter): datagrams sent, by first key
//! - `notifier_failures_total` (counter): failed sends, by first key
//! - `lifecycle_signals_total` (counter): signals received, by name
//! - `lifecycle_reloads_total` (counter): reload cycles started
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_notification(kind: &str, delivered: bool) {
    let name = if delivered {
        "notifier_messages_total"
    } else {
        "notifier_failures_total"
    };
    metrics::counter!(name, "kind" => kind.to_owned()).increment(1);
}

pub fn record_signal(signal: &'static str) {
    metrics::counter!("lifecycle_signals_total", "signal" => signal).increment(1);
}

pub fn record_reload() {
    metrics::counter!("lifecycle_reloads_total").increment(1);
}
