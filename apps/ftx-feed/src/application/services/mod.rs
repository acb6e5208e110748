//! Application Services
//!
//! - `EventCollector`: buffers sink calls into owned [`FeedEvent`]s so a
//!   session can forward them to its consumer after each message.

use rust_decimal::Decimal;

use crate::application::ports::{QuoteSink, TradeSink};
use crate::domain::market_data::{
    BookEvent, BookKind, FeedEvent, PriceLevel, QuoteSize, Side, TimestampMillis, TradeEvent,
};

/// Sink that turns book transactions and trades into [`FeedEvent`]s.
///
/// A book transaction only becomes visible once it is finished; an aborted
/// transaction is dropped whole, so a consumer never sees half a message.
#[derive(Debug, Default)]
pub struct EventCollector {
    open: Option<BookEvent>,
    events: Vec<FeedEvent>,
}

impl EventCollector {
    /// Create an empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            open: None,
            events: Vec::new(),
        }
    }

    /// Take every completed event, oldest first.
    pub fn drain(&mut self) -> Vec<FeedEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of completed events waiting to be drained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no completed events are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether a book transaction is open.
    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.open.is_some()
    }

    fn begin(&mut self, kind: BookKind, instrument: &str, timestamp_ms: TimestampMillis) {
        if let Some(stale) = self.open.take() {
            tracing::warn!(
                instrument = %stale.instrument,
                kind = stale.kind.as_str(),
                "Discarding unfinished book transaction"
            );
        }
        self.open = Some(BookEvent::new(kind, instrument.to_string(), timestamp_ms));
    }
}

impl QuoteSink for EventCollector {
    fn begin_snapshot(&mut self, instrument: &str, timestamp_ms: TimestampMillis) {
        self.begin(BookKind::Snapshot, instrument, timestamp_ms);
    }

    fn begin_update(&mut self, instrument: &str, timestamp_ms: TimestampMillis) {
        self.begin(BookKind::Update, instrument, timestamp_ms);
    }

    fn emit_quote(&mut self, price: Decimal, size: QuoteSize, side: Side) {
        match self.open.as_mut() {
            Some(event) => event.levels.push((PriceLevel { price, size }, side)),
            None => tracing::warn!(%price, side = side.as_str(), "Quote outside a book transaction"),
        }
    }

    fn finish(&mut self) {
        if let Some(event) = self.open.take() {
            self.events.push(FeedEvent::Book(event));
        }
    }

    fn abort(&mut self) {
        if let Some(event) = self.open.take() {
            tracing::debug!(
                instrument = %event.instrument,
                levels = event.levels.len(),
                "Book transaction aborted"
            );
        }
    }
}

impl TradeSink for EventCollector {
    fn emit_trade(
        &mut self,
        instrument: &str,
        timestamp_ms: TimestampMillis,
        price: Decimal,
        size: Decimal,
    ) {
        self.events.push(FeedEvent::Trade(TradeEvent {
            instrument: instrument.to_string(),
            timestamp_ms,
            price,
            size,
        }));
    }
}
