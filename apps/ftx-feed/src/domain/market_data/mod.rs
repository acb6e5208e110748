//! Normalized Market Data Types
//!
//! Vendor-neutral representation of order book mutations and trade prints.
//! Exchange adapters translate their wire formats into these types; the
//! downstream consumer never sees exchange-specific shapes.
//!
//! # Delete Marker
//!
//! Incremental book updates signal "remove this price level" with a
//! distinguished size value, [`QuoteSize::Delete`]. A snapshot never
//! carries it: snapshot sizes are authoritative as received.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

// =============================================================================
// Types
// =============================================================================

/// Exchange symbol identifying a tradable market (e.g. `BTC-PERP`).
pub type Instrument = String;

/// Epoch timestamp in milliseconds.
pub type TimestampMillis = i64;

/// Book side of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Buy side.
    Bid,
    /// Sell side.
    Ask,
}

impl Side {
    /// Lowercase side name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bid => "bid",
            Self::Ask => "ask",
        }
    }

    /// Whether this is the ask side.
    #[must_use]
    pub const fn is_ask(self) -> bool {
        matches!(self, Self::Ask)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size of a price level.
///
/// Either a concrete size or the delete marker. The marker is kept as a
/// separate variant instead of a magic number so it can never collide with
/// a legitimately tiny size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteSize {
    /// Size as reported by the exchange.
    Size(Decimal),
    /// Remove this price level.
    Delete,
}

impl QuoteSize {
    /// The delete marker.
    pub const DELETE: Self = Self::Delete;

    /// Size for an incremental update: zero means delete.
    #[must_use]
    pub fn for_update(size: Decimal) -> Self {
        if size.is_zero() {
            Self::Delete
        } else {
            Self::Size(size)
        }
    }

    /// Whether this is the delete marker.
    #[must_use]
    pub const fn is_delete_marker(&self) -> bool {
        matches!(self, Self::Delete)
    }

    /// Concrete size, `None` for the delete marker.
    #[must_use]
    pub const fn value(&self) -> Option<Decimal> {
        match self {
            Self::Size(size) => Some(*size),
            Self::Delete => None,
        }
    }
}

impl From<Decimal> for QuoteSize {
    fn from(size: Decimal) -> Self {
        Self::Size(size)
    }
}

/// A single price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    /// Level price.
    pub price: Decimal,
    /// Level size or delete marker.
    pub size: QuoteSize,
}

/// Kind of book transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookKind {
    /// Full replacement of the instrument's book.
    Snapshot,
    /// Partial mutation of an established book.
    Update,
}

impl BookKind {
    /// Lowercase kind name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Update => "update",
        }
    }
}

/// One book transaction: all levels of a snapshot or an update message.
///
/// Levels keep the order they were received in: every bid of the payload,
/// then every ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookEvent {
    /// Snapshot or update.
    pub kind: BookKind,
    /// Instrument symbol.
    pub instrument: Instrument,
    /// Exchange timestamp.
    pub timestamp_ms: TimestampMillis,
    /// Levels in received order.
    pub levels: Vec<(PriceLevel, Side)>,
}

impl BookEvent {
    /// Create an empty book event.
    #[must_use]
    pub const fn new(kind: BookKind, instrument: Instrument, timestamp_ms: TimestampMillis) -> Self {
        Self {
            kind,
            instrument,
            timestamp_ms,
            levels: Vec::new(),
        }
    }

    /// Levels on one side, in received order.
    pub fn side(&self, side: Side) -> impl Iterator<Item = &PriceLevel> {
        self.levels
            .iter()
            .filter(move |(_, s)| *s == side)
            .map(|(level, _)| level)
    }

    /// Whether this event replaces the whole book.
    #[must_use]
    pub const fn is_snapshot(&self) -> bool {
        matches!(self.kind, BookKind::Snapshot)
    }
}

/// A trade print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeEvent {
    /// Instrument symbol.
    pub instrument: Instrument,
    /// Execution timestamp.
    pub timestamp_ms: TimestampMillis,
    /// Execution price.
    pub price: Decimal,
    /// Executed size.
    pub size: Decimal,
}

/// Event forwarded from a feed session to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// Connected and subscriptions sent.
    Connected,
    /// Connection lost or closed.
    Disconnected,
    /// Book snapshot or update.
    Book(BookEvent),
    /// Trade print.
    Trade(TradeEvent),
    /// A message failed or the exchange reported an error.
    Error(String),
}

// =============================================================================
// Selection
// =============================================================================

/// Data kinds requested at startup.
///
/// Fixed for the lifetime of a feed. Determines which channels are
/// subscribed and which payloads are translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    /// Top of book.
    pub level1: bool,
    /// Book depth.
    pub level2: bool,
    /// Trade prints.
    pub trades: bool,
}

impl Selection {
    /// Create a selection.
    #[must_use]
    pub const fn new(level1: bool, level2: bool, trades: bool) -> Self {
        Self {
            level1,
            level2,
            trades,
        }
    }

    /// Everything.
    #[must_use]
    pub const fn all() -> Self {
        Self::new(true, true, true)
    }

    /// Whether any book data (level 1 or level 2) is requested.
    #[must_use]
    pub const fn book(&self) -> bool {
        self.level1 || self.level2
    }

    /// Whether trade prints are requested.
    #[must_use]
    pub const fn trades(&self) -> bool {
        self.trades
    }

    /// Whether nothing is requested.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.book() && !self.trades
    }
}

/// Unknown entry in a selection list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown data kind: {0}")]
pub struct UnknownDataKind(pub String);

impl FromStr for Selection {
    type Err = UnknownDataKind;

    /// Parse a comma-separated list such as `level2,trades`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut selection = Self::default();

        for kind in s.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            match kind.to_lowercase().as_str() {
                "level1" | "l1" => selection.level1 = true,
                "level2" | "l2" | "book" | "orderbook" => selection.level2 = true,
                "trades" | "trade" => selection.trades = true,
                _ => return Err(UnknownDataKind(kind.to_string())),
            }
        }

        Ok(selection)
    }
}
