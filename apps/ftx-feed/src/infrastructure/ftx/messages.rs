//! FTX WebSocket Message Types
//!
//! Wire format for the FTX public WebSocket API (`wss://ftx.com/ws/`).
//!
//! # Outbound
//!
//! ```json
//! {"op": "subscribe", "channel": "orderbook", "market": "BTC-PERP"}
//! {"op": "unsubscribe", "channel": "trades", "market": "BTC-PERP"}
//! {"op": "ping"}
//! ```
//!
//! # Inbound
//!
//! ```json
//! {"channel": "orderbook", "market": "BTC-PERP", "type": "partial",
//!  "data": {"time": 1700000000.123, "bids": [[100.5, 2.0]], "asks": [[101.0, 1.5]]}}
//! {"channel": "orderbook", "market": "BTC-PERP", "type": "update",
//!  "data": {"time": 1700000000.456, "bids": [[100.5, 0]], "asks": []}}
//! {"channel": "trades", "market": "BTC-PERP", "type": "update",
//!  "data": [{"price": 100.5, "size": 2, "time": "2023-01-01T00:00:00+00:00"}]}
//! {"type": "subscribed", "channel": "trades", "market": "BTC-PERP"}
//! {"type": "error", "code": 400, "msg": "Invalid market"}
//! {"type": "pong"}
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// Field Names
// =============================================================================

/// Routing field naming the topic.
pub const FIELD_CHANNEL: &str = "channel";
/// Message kind (`partial`, `update`, or a control kind).
pub const FIELD_TYPE: &str = "type";
/// Instrument symbol.
pub const FIELD_MARKET: &str = "market";
/// Channel payload.
pub const FIELD_DATA: &str = "data";
/// Book time (decimal seconds) or trade time (ISO-8601).
pub const FIELD_TIME: &str = "time";
/// Bid levels of a book payload.
pub const FIELD_BIDS: &str = "bids";
/// Ask levels of a book payload.
pub const FIELD_ASKS: &str = "asks";
/// Trade price.
pub const FIELD_PRICE: &str = "price";
/// Trade size.
pub const FIELD_SIZE: &str = "size";
/// Control message code.
pub const FIELD_CODE: &str = "code";
/// Control message text.
pub const FIELD_MSG: &str = "msg";

// =============================================================================
// Outbound Messages
// =============================================================================

/// Request operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    /// Start a channel for a market.
    Subscribe,
    /// Stop a channel for a market.
    Unsubscribe,
    /// Keep-alive.
    Ping,
}

/// Subscribable channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Order book snapshots and updates.
    Orderbook,
    /// Trade prints.
    Trades,
}

impl Channel {
    /// Wire name of the channel.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orderbook => "orderbook",
            Self::Trades => "trades",
        }
    }

    /// Match a wire channel name, ignoring ASCII case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case(Self::Orderbook.as_str()) {
            Some(Self::Orderbook)
        } else if name.eq_ignore_ascii_case(Self::Trades.as_str()) {
            Some(Self::Trades)
        } else {
            None
        }
    }
}

/// Subscribe or unsubscribe request for one channel of one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// `subscribe` or `unsubscribe`.
    pub op: Op,
    /// Channel to (un)subscribe.
    pub channel: Channel,
    /// Market symbol.
    pub market: String,
}

impl SubscriptionRequest {
    /// Create a subscribe request.
    #[must_use]
    pub fn subscribe(channel: Channel, market: impl Into<String>) -> Self {
        Self {
            op: Op::Subscribe,
            channel,
            market: market.into(),
        }
    }

    /// Create an unsubscribe request.
    #[must_use]
    pub fn unsubscribe(channel: Channel, market: impl Into<String>) -> Self {
        Self {
            op: Op::Unsubscribe,
            channel,
            market: market.into(),
        }
    }
}

/// Keep-alive request: `{"op":"ping"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRequest {
    /// Always `ping`.
    pub op: Op,
}

impl PingRequest {
    /// Create the ping request.
    #[must_use]
    pub const fn new() -> Self {
        Self { op: Op::Ping }
    }
}

impl Default for PingRequest {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Inbound Control Messages
// =============================================================================

/// Messages that carry no market data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Reply to a ping.
    Pong,
    /// Channel subscription confirmed.
    Subscribed {
        /// Confirmed channel, if named.
        channel: Option<String>,
        /// Confirmed market, if named.
        market: Option<String>,
    },
    /// Channel unsubscription confirmed.
    Unsubscribed {
        /// Channel, if named.
        channel: Option<String>,
        /// Market, if named.
        market: Option<String>,
    },
    /// Informational notice from the exchange.
    Info {
        /// Notice code.
        code: Option<i64>,
        /// Notice text.
        msg: String,
    },
    /// Error reported by the exchange.
    Error {
        /// Error code.
        code: Option<i64>,
        /// Error text.
        msg: String,
    },
}

impl ControlMessage {
    /// Control kinds recognized in the `type` field.
    pub const KINDS: &'static [&'static str] = &["pong", "subscribed", "unsubscribed", "info", "error"];
}
