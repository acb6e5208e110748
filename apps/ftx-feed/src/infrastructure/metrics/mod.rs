//! Prometheus Metrics Module
//!
//! # Metrics
//!
//! - `ftx_feed_messages_received_total`: complete messages read from the socket
//! - `ftx_feed_book_events_total{kind}`: book transactions delivered
//! - `ftx_feed_trades_total`: trade prints delivered
//! - `ftx_feed_message_errors_total{kind}`: messages dropped, by error kind
//! - `ftx_feed_connections`: open exchange connections
//! - `ftx_feed_message_processing_seconds`: decode and translate latency
//!
//! # Integration
//!
//! With a non-zero port the exporter serves `/metrics` on `0.0.0.0:<port>`.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::market_data::BookKind;

/// Errors raised while installing the exporter.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Recorder or listener configuration was rejected.
    #[error("failed to build Prometheus exporter: {0}")]
    Build(#[from] BuildError),

    /// Another global recorder is already installed.
    #[error("failed to install global recorder: {0}")]
    Install(String),
}

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// Port `0` installs the recorder without an HTTP listener; the handle can
/// still render the exposition text. Later calls return the first handle.
///
/// # Errors
///
/// Returns an error if the recorder or the HTTP listener cannot be set up.
pub fn init_metrics(port: u16) -> Result<PrometheusHandle, MetricsError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let builder = PrometheusBuilder::new();
    let handle = if port == 0 {
        builder.install_recorder()?
    } else {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let (recorder, exporter) = builder.with_http_listener(addr).build()?;
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|e| MetricsError::Install(e.to_string()))?;
        tokio::spawn(async move {
            if exporter.await.is_err() {
                tracing::error!("Metrics exporter stopped");
            }
        });
        tracing::info!(%addr, "Metrics endpoint listening");
        handle
    };

    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "ftx_feed_messages_received_total",
        "Total complete messages received from FTX"
    );
    describe_counter!(
        "ftx_feed_book_events_total",
        "Total book transactions delivered by kind"
    );
    describe_counter!("ftx_feed_trades_total", "Total trade prints delivered");
    describe_counter!(
        "ftx_feed_message_errors_total",
        "Total messages dropped by error kind"
    );
    describe_gauge!("ftx_feed_connections", "Open FTX WebSocket connections");
    describe_histogram!(
        "ftx_feed_message_processing_seconds",
        "Time to decode and translate one message"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a complete message read from the socket.
pub fn record_message_received() {
    counter!("ftx_feed_messages_received_total").increment(1);
}

/// Record a delivered book transaction.
pub fn record_book_event(kind: BookKind) {
    counter!("ftx_feed_book_events_total", "kind" => kind.as_str()).increment(1);
}

/// Record delivered trade prints.
pub fn record_trades(count: u64) {
    counter!("ftx_feed_trades_total").increment(count);
}

/// Record a dropped message.
pub fn record_message_error(kind: &'static str) {
    counter!("ftx_feed_message_errors_total", "kind" => kind).increment(1);
}

/// Update the open connection count.
pub fn set_connections(count: f64) {
    gauge!("ftx_feed_connections").set(count);
}

/// Record message processing duration.
pub fn record_processing_duration(duration: Duration) {
    histogram!("ftx_feed_message_processing_seconds").record(duration.as_secs_f64());
}
