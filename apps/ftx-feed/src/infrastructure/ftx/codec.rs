//! FTX JSON Codec
//!
//! Parses complete WebSocket messages and classifies them by channel and
//! type. Classification borrows from the parsed value; the translators walk
//! the borrowed payload without copying it.
//!
//! # Routing
//!
//! | `channel`   | `type`      | Result                  |
//! |-------------|-------------|-------------------------|
//! | `orderbook` | `partial`   | book snapshot           |
//! | `orderbook` | `update`    | book update             |
//! | `orderbook` | other       | ignored                 |
//! | `trades`    | any         | trades                  |
//! | other       | control     | control message         |
//! | other       | other       | ignored                 |
//!
//! Channel and type names are matched ignoring ASCII case.

use std::borrow::Cow;
use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};

use super::messages::{
    Channel, ControlMessage, FIELD_CHANNEL, FIELD_CODE, FIELD_DATA, FIELD_MARKET, FIELD_MSG,
    FIELD_TYPE,
};
use crate::domain::market_data::{BookKind, Side, TimestampMillis};

const MILLIS_PER_SECOND: Decimal = Decimal::ONE_THOUSAND;

// =============================================================================
// Error Type
// =============================================================================

/// Errors raised while decoding one message.
///
/// Every variant is fatal for the message being decoded and for nothing
/// else; the session keeps running.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Top-level message is not a JSON object.
    #[error("expected JSON object, got: {0}")]
    NotAnObject(&'static str),

    /// Required field is absent or null.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Field is present but has the wrong shape.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A price/size pair does not have exactly two elements.
    #[error("unexpected size of {} quote: {count}", quote_side(.side))]
    ProtocolViolation {
        /// Side the pair was listed under.
        side: Side,
        /// Observed element count.
        count: usize,
    },

    /// Timestamp could not be converted to epoch milliseconds.
    #[error("invalid timestamp {value}: {reason}")]
    InvalidTimestamp {
        /// Raw timestamp.
        value: String,
        /// Parse failure.
        reason: String,
    },
}

impl CodecError {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) | Self::NotAnObject(_) => "malformed_json",
            Self::MissingField(_) => "missing_field",
            Self::InvalidField { .. } => "invalid_field",
            Self::ProtocolViolation { .. } => "protocol_violation",
            Self::InvalidTimestamp { .. } => "invalid_timestamp",
        }
    }
}

const fn quote_side(side: &Side) -> &'static str {
    match side {
        Side::Bid => "a bid",
        Side::Ask => "an ask",
    }
}

// =============================================================================
// Classified Message
// =============================================================================

/// A message routed by channel and type, borrowing its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FtxMessage<'a> {
    /// Order book snapshot (`partial`) or update.
    Book {
        /// Market symbol.
        market: &'a str,
        /// Snapshot or update.
        kind: BookKind,
        /// Book payload with `time`, `bids`, `asks`.
        data: &'a Map<String, Value>,
    },
    /// Trade prints.
    Trades {
        /// Market symbol.
        market: &'a str,
        /// Trade records; `None` when the message has no `data`.
        data: Option<&'a [Value]>,
    },
    /// Pong, subscription confirmation, info or error.
    Control(ControlMessage),
    /// Unknown channel or type.
    Ignored,
}

// =============================================================================
// Codec
// =============================================================================

/// JSON codec for the FTX WebSocket API.
#[derive(Debug, Default, Clone)]
pub struct FtxCodec;

impl FtxCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parse one complete message.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON.
    pub fn parse(&self, text: &str) -> Result<Value, CodecError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Route a parsed message by its `channel` and `type` fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is not an object, or a routed
    /// message lacks its `market` or `data`.
    pub fn classify<'a>(&self, value: &'a Value) -> Result<FtxMessage<'a>, CodecError> {
        let object = value
            .as_object()
            .ok_or_else(|| CodecError::NotAnObject(json_kind(value)))?;

        // Non-string routing fields make the message unrecognized, not invalid.
        let msg_type = object.get(FIELD_TYPE).and_then(Value::as_str);

        if let Some(kind) = msg_type
            && let Some(control) = control_message(object, kind)?
        {
            return Ok(FtxMessage::Control(control));
        }

        let channel = object
            .get(FIELD_CHANNEL)
            .and_then(Value::as_str)
            .and_then(Channel::parse);

        match channel {
            Some(Channel::Orderbook) => {
                let kind = match msg_type {
                    Some(t) if t.eq_ignore_ascii_case("partial") => BookKind::Snapshot,
                    Some(t) if t.eq_ignore_ascii_case("update") => BookKind::Update,
                    _ => return Ok(FtxMessage::Ignored),
                };
                let market = required_str(object, FIELD_MARKET)?;
                let data = object
                    .get(FIELD_DATA)
                    .filter(|v| !v.is_null())
                    .ok_or(CodecError::MissingField(FIELD_DATA))?
                    .as_object()
                    .ok_or_else(|| invalid(FIELD_DATA, "expected object"))?;

                Ok(FtxMessage::Book { market, kind, data })
            }
            Some(Channel::Trades) => {
                let market = required_str(object, FIELD_MARKET)?;
                let data = array_field(object, FIELD_DATA)?;
                Ok(FtxMessage::Trades { market, data })
            }
            None => Ok(FtxMessage::Ignored),
        }
    }

    /// Encode an outbound message.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

fn control_message(
    object: &Map<String, Value>,
    kind: &str,
) -> Result<Option<ControlMessage>, CodecError> {
    let Some(kind) = ControlMessage::KINDS
        .iter()
        .find(|k| kind.eq_ignore_ascii_case(k))
    else {
        return Ok(None);
    };

    let owned = |field: &'static str| -> Result<Option<String>, CodecError> {
        Ok(str_field(object, field)?.map(str::to_string))
    };
    let code = object.get(FIELD_CODE).and_then(Value::as_i64);

    let message = match *kind {
        "pong" => ControlMessage::Pong,
        "subscribed" => ControlMessage::Subscribed {
            channel: owned(FIELD_CHANNEL)?,
            market: owned(FIELD_MARKET)?,
        },
        "unsubscribed" => ControlMessage::Unsubscribed {
            channel: owned(FIELD_CHANNEL)?,
            market: owned(FIELD_MARKET)?,
        },
        "info" => ControlMessage::Info {
            code,
            msg: owned(FIELD_MSG)?.unwrap_or_default(),
        },
        _ => ControlMessage::Error {
            code,
            msg: owned(FIELD_MSG)?.unwrap_or_default(),
        },
    };

    Ok(Some(message))
}

// =============================================================================
// Frame Assembly
// =============================================================================

/// Accumulates message fragments until the last one arrives.
///
/// A single-fragment message is handed back without copying.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: String,
}

impl FrameAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Add a fragment. Returns the complete message once `last` is set.
    pub fn push<'a>(&mut self, fragment: &'a str, last: bool) -> Option<Cow<'a, str>> {
        if !last {
            self.buffer.push_str(fragment);
            return None;
        }

        if self.buffer.is_empty() {
            return Some(Cow::Borrowed(fragment));
        }

        self.buffer.push_str(fragment);
        Some(Cow::Owned(std::mem::take(&mut self.buffer)))
    }

    /// Drop any partial message.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Bytes buffered from incomplete messages.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

// =============================================================================
// Field Helpers
// =============================================================================

fn invalid(field: &'static str, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidField {
        field,
        reason: reason.into(),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Optional string field; `null` counts as absent.
pub(crate) fn str_field<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a str>, CodecError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(invalid(
            field,
            format!("expected string, got {}", json_kind(other)),
        )),
    }
}

/// Required string field.
pub(crate) fn required_str<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, CodecError> {
    str_field(object, field)?.ok_or(CodecError::MissingField(field))
}

/// Optional array field; `null` counts as absent.
pub(crate) fn array_field<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a [Value]>, CodecError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.as_slice())),
        Some(other) => Err(invalid(
            field,
            format!("expected array, got {}", json_kind(other)),
        )),
    }
}

/// Decode a JSON number (or numeric string) without going through `f64`.
///
/// Relies on `serde_json`'s `arbitrary_precision`, which keeps the number's
/// source text.
pub(crate) fn decimal(value: &Value, field: &'static str) -> Result<Decimal, CodecError> {
    let text: Cow<'_, str> = match value {
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::String(s) => Cow::Borrowed(s),
        Value::Null => return Err(CodecError::MissingField(field)),
        other => {
            return Err(invalid(
                field,
                format!("expected number, got {}", json_kind(other)),
            ));
        }
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| invalid(field, format!("{text}: {e}")))
}

/// Required decimal field.
pub(crate) fn required_decimal(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Decimal, CodecError> {
    let value = object.get(field).ok_or(CodecError::MissingField(field))?;
    decimal(value, field)
}

/// Convert exchange time in decimal seconds to epoch milliseconds.
///
/// Multiplies by 1000 and truncates toward zero.
pub(crate) fn seconds_to_millis(seconds: Decimal) -> Result<TimestampMillis, CodecError> {
    seconds
        .checked_mul(MILLIS_PER_SECOND)
        .and_then(|millis| millis.trunc().to_i64())
        .ok_or_else(|| CodecError::InvalidTimestamp {
            value: seconds.to_string(),
            reason: "out of range".to_string(),
        })
}

/// Convert an ISO-8601 timestamp with offset to epoch milliseconds.
///
/// Accepts RFC 3339 and the minute-precision form (`2023-01-01T00:00Z`).
pub(crate) fn iso8601_to_millis(text: &str) -> Result<TimestampMillis, CodecError> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|e| {
            let offset_text: Cow<'_, str> = match text.strip_suffix(['Z', 'z']) {
                Some(local) => Cow::Owned(format!("{local}+00:00")),
                None => Cow::Borrowed(text),
            };
            DateTime::parse_from_str(&offset_text, MINUTE_PRECISION_FORMAT).map_err(|_| e)
        })
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| CodecError::InvalidTimestamp {
            value: text.to_string(),
            reason: e.to_string(),
        })
}

const MINUTE_PRECISION_FORMAT: &str = "%Y-%m-%dT%H:%M%:z";

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn classify(json: &str) -> Result<String, CodecError> {
        let codec = FtxCodec::new();
        let value = codec.parse(json)?;
        Ok(match codec.classify(&value)? {
            FtxMessage::Book { market, kind, .. } => format!("book:{}:{market}", kind.as_str()),
            FtxMessage::Trades { market, data } => {
                format!("trades:{market}:{}", data.map_or(0, <[Value]>::len))
            }
            FtxMessage::Control(ControlMessage::Pong) => "pong".to_string(),
            FtxMessage::Control(ControlMessage::Error { msg, .. }) => format!("error:{msg}"),
            FtxMessage::Control(_) => "control".to_string(),
            FtxMessage::Ignored => "ignored".to_string(),
        })
    }

    #[test_case(r#"{"channel":"orderbook","market":"BTC-PERP","type":"partial","data":{}}"#, "book:snapshot:BTC-PERP" ; "partial")]
    #[test_case(r#"{"channel":"orderbook","market":"BTC-PERP","type":"update","data":{}}"#, "book:update:BTC-PERP" ; "update")]
    #[test_case(r#"{"channel":"ORDERBOOK","market":"X","type":"Partial","data":{}}"#, "book:snapshot:X" ; "case insensitive")]
    #[test_case(r#"{"channel":"orderbook","market":"X","type":"checksum","data":{}}"#, "ignored" ; "unknown book type")]
    #[test_case(r#"{"channel":"orderbook","market":"X"}"#, "ignored" ; "book without type")]
    #[test_case(r#"{"channel":"trades","market":"ETH-PERP","type":"update","data":[{},{}]}"#, "trades:ETH-PERP:2" ; "trades")]
    #[test_case(r#"{"channel":"Trades","market":"ETH-PERP"}"#, "trades:ETH-PERP:0" ; "trades without data")]
    #[test_case(r#"{"channel":"heartbeat","market":"X","data":{}}"#, "ignored" ; "unknown channel")]
    #[test_case(r#"{"type":"pong"}"#, "pong" ; "pong")]
    #[test_case(r#"{"type":"subscribed","channel":"trades","market":"X"}"#, "control" ; "subscribed")]
    #[test_case(r#"{"type":"error","code":400,"msg":"Invalid market"}"#, "error:Invalid market" ; "exchange error")]
    #[test_case(r#"{}"#, "ignored" ; "empty object")]
    #[test_case(r#"{"channel":"heartbeat","type":5}"#, "ignored" ; "unknown channel with numeric type")]
    #[test_case(r#"{"channel":7,"market":"X"}"#, "ignored" ; "numeric channel")]
    #[test_case(r#"{"channel":"orderbook","market":"X","type":["partial"],"data":{}}"#, "ignored" ; "book with array type")]
    fn routes_message(json: &str, expected: &str) {
        assert_eq!(classify(json).unwrap(), expected);
    }

    #[test]
    fn malformed_json_is_error() {
        let err = classify(r#"{"channel":"orderbook""#).unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
        assert_eq!(err.kind(), "malformed_json");
    }

    #[test]
    fn non_object_is_error() {
        let err = classify("[1,2]").unwrap_err();
        assert!(matches!(err, CodecError::NotAnObject("array")));
    }

    #[test]
    fn book_without_market_is_error() {
        let err = classify(r#"{"channel":"orderbook","type":"partial","data":{}}"#).unwrap_err();
        assert!(matches!(err, CodecError::MissingField("market")));
    }

    #[test]
    fn book_without_data_is_error() {
        let err = classify(r#"{"channel":"orderbook","market":"X","type":"update"}"#).unwrap_err();
        assert!(matches!(err, CodecError::MissingField("data")));
    }

    #[test]
    fn trades_with_object_data_is_error() {
        let err = classify(r#"{"channel":"trades","market":"X","data":{}}"#).unwrap_err();
        assert!(matches!(err, CodecError::InvalidField { field: "data", .. }));
    }

    #[test]
    fn protocol_violation_message_names_side() {
        let bid = CodecError::ProtocolViolation {
            side: Side::Bid,
            count: 3,
        };
        let ask = CodecError::ProtocolViolation {
            side: Side::Ask,
            count: 1,
        };
        assert_eq!(bid.to_string(), "unexpected size of a bid quote: 3");
        assert_eq!(ask.to_string(), "unexpected size of an ask quote: 1");
    }

    #[test]
    fn seconds_to_millis_truncates() {
        let seconds = Decimal::from_str("1700000000.123").unwrap();
        assert_eq!(seconds_to_millis(seconds).unwrap(), 1_700_000_000_123);

        let seconds = Decimal::from_str("1700000000.1239999").unwrap();
        assert_eq!(seconds_to_millis(seconds).unwrap(), 1_700_000_000_123);

        assert_eq!(seconds_to_millis(Decimal::from(2)).unwrap(), 2_000);
    }

    #[test]
    fn json_number_decodes_exactly() {
        let value: Value = serde_json::from_str("1700000000.123").unwrap();
        assert_eq!(
            decimal(&value, "time").unwrap(),
            Decimal::from_str("1700000000.123").unwrap()
        );

        let value: Value = serde_json::from_str("1e-8").unwrap();
        assert_eq!(decimal(&value, "size").unwrap(), Decimal::new(1, 8));

        let value: Value = serde_json::from_str(r#""42.5""#).unwrap();
        assert_eq!(decimal(&value, "price").unwrap(), Decimal::new(425, 1));
    }

    #[test_case("1700000000.9999999", 1_700_000_000_999 ; "just below next second")]
    #[test_case("1700000000.1239999", 1_700_000_000_123 ; "just below next milli")]
    #[test_case("1700000000.5", 1_700_000_000_500 ; "half second")]
    fn json_time_truncates_from_source_text(json: &str, expected: TimestampMillis) {
        let value: Value = serde_json::from_str(json).unwrap();
        let seconds = decimal(&value, "time").unwrap();
        assert_eq!(seconds_to_millis(seconds).unwrap(), expected);
    }

    #[test]
    fn json_price_keeps_all_digits() {
        let value: Value = serde_json::from_str("12345678901234567.5").unwrap();
        assert_eq!(
            decimal(&value, "price").unwrap(),
            Decimal::from_str("12345678901234567.5").unwrap()
        );
    }

    #[test]
    fn non_numeric_decimal_is_error() {
        let value: Value = serde_json::from_str("true").unwrap();
        assert!(matches!(
            decimal(&value, "price"),
            Err(CodecError::InvalidField { field: "price", .. })
        ));
        assert!(matches!(
            decimal(&Value::Null, "size"),
            Err(CodecError::MissingField("size"))
        ));
    }

    #[test]
    fn iso8601_parsing() {
        assert_eq!(
            iso8601_to_millis("2023-01-01T00:00:00Z").unwrap(),
            1_672_531_200_000
        );
        assert_eq!(
            iso8601_to_millis("2023-01-01T00:00:00.250+00:00").unwrap(),
            1_672_531_200_250
        );
        assert_eq!(
            iso8601_to_millis("2023-01-01T00:01Z").unwrap(),
            1_672_531_260_000
        );
        assert_eq!(
            iso8601_to_millis("2023-01-01T02:00+02:00").unwrap(),
            1_672_531_200_000
        );
        assert!(matches!(
            iso8601_to_millis("2023-01-01T00:00"),
            Err(CodecError::InvalidTimestamp { .. })
        ));
        assert!(matches!(
            iso8601_to_millis("yesterday"),
            Err(CodecError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn assembler_returns_single_fragment_borrowed() {
        let mut assembler = FrameAssembler::new();
        let message = assembler.push(r#"{"type":"pong"}"#, true).unwrap();
        assert!(matches!(message, Cow::Borrowed(_)));
    }

    #[test]
    fn assembler_joins_fragments() {
        let mut assembler = FrameAssembler::new();
        assert!(assembler.push(r#"{"type":"#, false).is_none());
        assert_eq!(assembler.pending_len(), 8);

        let message = assembler.push(r#""pong"}"#, true).unwrap();
        assert_eq!(message, r#"{"type":"pong"}"#);
        assert_eq!(assembler.pending_len(), 0);
    }

    #[test]
    fn assembler_reset_drops_partial() {
        let mut assembler = FrameAssembler::new();
        assembler.push("garbage", false);
        assembler.reset();
        assert_eq!(assembler.push("{}", true).unwrap(), "{}");
    }
}
