//! FTX Feed Binary
//!
//! Connects to FTX and logs normalized book and trade events.
//!
//! # Usage
//!
//! ```bash
//! FTX_SYMBOLS=BTC-PERP,ETH-PERP cargo run --bin ftx-feed
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `FTX_SYMBOLS`: comma-separated markets
//!
//! ## Optional
//! - `FTX_WS_URL`: endpoint (default: `wss://ftx.com/ws/`)
//! - `FTX_SELECTION`: data kinds (default: `level2,trades`)
//! - `FTX_BOOK_DEPTH`: levels shown per side in logs (default: 20)
//! - `FTX_PING_INTERVAL_MS`: keep-alive interval (default: 5000)
//! - `FTX_IDLE_TIMEOUT_MS`: inbound silence limit (default: 15000)
//! - `FTX_METRICS_PORT`: Prometheus port, 0 to disable (default: 9090)
//! - `OTEL_ENABLED`, `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`
//! - `RUST_LOG`: Log level (default: info)

use std::time::Duration;

use anyhow::Context;
use ftx_feed::infrastructure::telemetry;
use ftx_feed::{
    BookEvent, FeedConfig, FeedEvent, FtxClient, FtxClientConfig, Side, init_metrics,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Event channel capacity.
const EVENT_BUFFER: usize = 4096;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    let _telemetry_guard = telemetry::init().context("failed to initialize telemetry")?;

    tracing::info!("Starting FTX feed");

    let config = FeedConfig::from_env()?;
    log_config(&config);

    let _metrics_handle =
        init_metrics(config.server.metrics_port).context("failed to initialize metrics")?;

    let shutdown_token = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::channel::<FeedEvent>(EVENT_BUFFER);

    let consumer = tokio::spawn(handle_feed_events(event_rx, config.book_depth));

    let client = FtxClient::new(
        FtxClientConfig::from(&config),
        event_tx,
        shutdown_token.clone(),
    );
    let mut client_task = tokio::spawn(async move { client.run().await });

    tracing::info!("FTX feed ready");

    tokio::select! {
        () = await_shutdown(shutdown_token.clone()) => {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut client_task).await {
                Ok(Ok(Err(e))) => tracing::warn!(error = %e, "FTX client stopped with error"),
                Ok(Err(e)) => tracing::error!(error = %e, "FTX client task failed"),
                Ok(Ok(Ok(()))) => {}
                Err(_) => {
                    tracing::warn!("FTX client did not stop in time");
                    client_task.abort();
                }
            }
        }
        result = &mut client_task => {
            shutdown_token.cancel();
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "FTX client error"),
                Err(e) => tracing::error!(error = %e, "FTX client task failed"),
            }
        }
    }

    let _ = consumer.await;

    tracing::info!("FTX feed stopped");
    Ok(())
}

/// Log every event the client forwards.
async fn handle_feed_events(mut rx: mpsc::Receiver<FeedEvent>, depth: usize) {
    while let Some(event) = rx.recv().await {
        match event {
            FeedEvent::Connected => tracing::info!("FTX feed connected"),
            FeedEvent::Disconnected => tracing::warn!("FTX feed disconnected"),
            FeedEvent::Book(book) => log_book(&book, depth),
            FeedEvent::Trade(trade) => {
                tracing::info!(
                    instrument = %trade.instrument,
                    timestamp_ms = trade.timestamp_ms,
                    price = %trade.price,
                    size = %trade.size,
                    "Trade"
                );
            }
            FeedEvent::Error(msg) => tracing::error!(error = %msg, "FTX feed error"),
        }
    }
}

fn log_book(book: &BookEvent, depth: usize) {
    let top = |side: Side| {
        book.side(side)
            .take(depth)
            .map(|level| match level.size.value() {
                Some(size) => format!("{}@{size}", level.price),
                None => format!("{}@delete", level.price),
            })
            .collect::<Vec<_>>()
            .join(" ")
    };

    tracing::info!(
        instrument = %book.instrument,
        kind = book.kind.as_str(),
        timestamp_ms = book.timestamp_ms,
        levels = book.levels.len(),
        bids = %top(Side::Bid),
        asks = %top(Side::Ask),
        "Book"
    );
}

/// Log the parsed configuration.
fn log_config(config: &FeedConfig) {
    tracing::info!(
        url = %config.websocket.url,
        instruments = ?config.instruments,
        selection = ?config.selection,
        ping_interval_ms = config.websocket.ping_interval.as_millis(),
        idle_timeout_ms = config.websocket.idle_timeout.as_millis(),
        metrics_port = config.server.metrics_port,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
