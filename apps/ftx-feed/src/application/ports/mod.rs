//! Port Interfaces
//!
//! Narrow contracts the translators produce into. The core depends only on
//! these traits, never on a concrete book implementation.
//!
//! ## Driven Ports (Outbound)
//!
//! - `QuoteSink`: receives one book transaction at a time
//! - `TradeSink`: receives trade prints
//! - `MarketDataSink`: both of the above

use rust_decimal::Decimal;

use crate::domain::market_data::{QuoteSize, Side, TimestampMillis};

/// Consumer of book transactions.
///
/// Every transaction is opened with [`begin_snapshot`](Self::begin_snapshot)
/// or [`begin_update`](Self::begin_update), receives zero or more quotes,
/// and is closed exactly once by [`finish`](Self::finish) or, when the
/// message turned out to be malformed halfway through, by
/// [`abort`](Self::abort).
#[cfg_attr(test, mockall::automock)]
pub trait QuoteSink {
    /// Open a transaction replacing the instrument's whole book.
    fn begin_snapshot(&mut self, instrument: &str, timestamp_ms: TimestampMillis);

    /// Open a transaction mutating the instrument's book.
    fn begin_update(&mut self, instrument: &str, timestamp_ms: TimestampMillis);

    /// Add one price level to the open transaction.
    fn emit_quote(&mut self, price: Decimal, size: QuoteSize, side: Side);

    /// Close the open transaction.
    fn finish(&mut self);

    /// Close the open transaction after a protocol violation.
    ///
    /// Quotes already emitted for it stay emitted.
    fn abort(&mut self) {}
}

/// Consumer of trade prints.
#[cfg_attr(test, mockall::automock)]
pub trait TradeSink {
    /// Receive one trade.
    fn emit_trade(
        &mut self,
        instrument: &str,
        timestamp_ms: TimestampMillis,
        price: Decimal,
        size: Decimal,
    );
}

/// Consumer of both book transactions and trades.
pub trait MarketDataSink: QuoteSink + TradeSink {}

impl<T: QuoteSink + TradeSink + ?Sized> MarketDataSink for T {}
