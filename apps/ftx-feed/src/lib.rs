#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! FTX Feed - Market Data Normalizer
//!
//! Consumes the FTX public WebSocket stream and replays order book
//! snapshots, incremental book deltas and trade prints into narrow sink
//! interfaces with exact decimal prices and epoch-millisecond timestamps.
//!
//! # Layers (inside to outside)
//!
//! - **Domain**: normalized book and trade types, the delete marker
//! - **Application**: sink ports and the event collector
//! - **Infrastructure**: FTX codec and translators, WebSocket client,
//!   configuration, metrics, telemetry
//!
//! # Data Flow
//!
//! ```text
//! FTX WS -> FtxClient -> FtxFeed::on_json -> translate_book / translate_trades
//!                                                  |
//!                                          QuoteSink / TradeSink
//!                                                  |
//!                                  EventCollector -> mpsc<FeedEvent>
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Normalized market data with no exchange knowledge.
pub mod domain;

/// Application layer - Sink ports and services.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::market_data::{
    BookEvent, BookKind, FeedEvent, Instrument, PriceLevel, QuoteSize, Selection, Side,
    TimestampMillis, TradeEvent, UnknownDataKind,
};

// Ports and services
pub use application::ports::{MarketDataSink, QuoteSink, TradeSink};
pub use application::services::EventCollector;

// FTX adapters
pub use infrastructure::ftx::{
    CodecError, FtxClient, FtxClientConfig, FtxClientError, FtxFeed, Processed,
    subscribe_requests, unsubscribe_requests,
};

// Configuration
pub use infrastructure::config::{ConfigError, FeedConfig, ServerSettings, WebSocketSettings};

// Metrics
pub use infrastructure::metrics::{MetricsError, init_metrics};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
