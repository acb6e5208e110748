//! Order Book Translation
//!
//! Replays an `orderbook` payload into a [`QuoteSink`] transaction.
//!
//! Snapshot sizes are passed through as received, zero included. In an
//! update a zero size means "remove this price" and is replaced with
//! [`QuoteSize::Delete`]. An update with no levels on either side produces
//! no sink call at all.

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use super::codec::{CodecError, array_field, decimal, required_decimal, seconds_to_millis};
use super::messages::{FIELD_ASKS, FIELD_BIDS, FIELD_TIME};
use crate::application::ports::QuoteSink;
use crate::domain::market_data::{BookKind, QuoteSize, Side};

/// Translate one book payload.
///
/// Bids are emitted before asks, each side in received order. An opened
/// transaction is always closed: by `finish` on success, by `abort` when a
/// level turns out to be malformed.
///
/// # Errors
///
/// Returns an error if `time` is missing or invalid, a side is not an
/// array, or a level is not a pair of two numbers.
pub fn translate_book<S>(
    sink: &mut S,
    instrument: &str,
    kind: BookKind,
    data: &Map<String, Value>,
) -> Result<(), CodecError>
where
    S: QuoteSink + ?Sized,
{
    let bids = array_field(data, FIELD_BIDS)?.unwrap_or_default();
    let asks = array_field(data, FIELD_ASKS)?.unwrap_or_default();

    match kind {
        BookKind::Snapshot => {
            let timestamp_ms = seconds_to_millis(required_decimal(data, FIELD_TIME)?)?;
            sink.begin_snapshot(instrument, timestamp_ms);
        }
        BookKind::Update => {
            if bids.is_empty() && asks.is_empty() {
                return Ok(());
            }
            let timestamp_ms = seconds_to_millis(required_decimal(data, FIELD_TIME)?)?;
            sink.begin_update(instrument, timestamp_ms);
        }
    }

    let result = emit_side(sink, bids, Side::Bid, kind)
        .and_then(|()| emit_side(sink, asks, Side::Ask, kind));

    match result {
        Ok(()) => {
            sink.finish();
            Ok(())
        }
        Err(e) => {
            sink.abort();
            Err(e)
        }
    }
}

fn emit_side<S>(sink: &mut S, levels: &[Value], side: Side, kind: BookKind) -> Result<(), CodecError>
where
    S: QuoteSink + ?Sized,
{
    for level in levels {
        let (price, size) = price_size(level, side)?;
        let size = match kind {
            BookKind::Snapshot => QuoteSize::Size(size),
            BookKind::Update => QuoteSize::for_update(size),
        };
        sink.emit_quote(price, size, side);
    }
    Ok(())
}

fn price_size(level: &Value, side: Side) -> Result<(Decimal, Decimal), CodecError> {
    let field = side_field(side);
    let pair = level.as_array().ok_or_else(|| CodecError::InvalidField {
        field,
        reason: "expected [price, size] array".to_string(),
    })?;

    let [price, size] = pair.as_slice() else {
        return Err(CodecError::ProtocolViolation {
            side,
            count: pair.len(),
        });
    };

    Ok((decimal(price, field)?, decimal(size, field)?))
}

const fn side_field(side: Side) -> &'static str {
    match side {
        Side::Bid => FIELD_BIDS,
        Side::Ask => FIELD_ASKS,
    }
}
