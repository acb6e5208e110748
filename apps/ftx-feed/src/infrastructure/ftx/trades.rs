//! Trade Translation
//!
//! Replays a `trades` payload into a [`TradeSink`], one call per record in
//! received order.

use serde_json::Value;

use super::codec::{CodecError, iso8601_to_millis, required_decimal, required_str};
use super::messages::{FIELD_DATA, FIELD_PRICE, FIELD_SIZE, FIELD_TIME};
use crate::application::ports::TradeSink;

/// Translate trade records.
///
/// Returns the number of trades emitted. Records before a malformed one
/// stay emitted.
///
/// # Errors
///
/// Returns an error if a record is not an object, lacks `price` or `size`,
/// or its `time` is missing or not ISO-8601.
pub fn translate_trades<S>(
    sink: &mut S,
    instrument: &str,
    records: Option<&[Value]>,
) -> Result<usize, CodecError>
where
    S: TradeSink + ?Sized,
{
    let Some(records) = records else {
        return Ok(0);
    };

    for record in records {
        let trade = record.as_object().ok_or_else(|| CodecError::InvalidField {
            field: FIELD_DATA,
            reason: "expected trade object".to_string(),
        })?;

        let price = required_decimal(trade, FIELD_PRICE)?;
        let size = required_decimal(trade, FIELD_SIZE)?;
        let timestamp_ms = iso8601_to_millis(required_str(trade, FIELD_TIME)?)?;

        sink.emit_trade(instrument, timestamp_ms, price, size);
    }

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockTradeSink;
    use mockall::Sequence;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;

    fn records(json: &str) -> Vec<Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn emits_one_call_per_record() {
        let data = records(r#"[{"price":100.5,"size":2,"time":"2023-01-01T00:00:00Z"}]"#);
        let mut sink = MockTradeSink::new();

        sink.expect_emit_trade()
            .with(
                eq("BTC-PERP"),
                eq(1_672_531_200_000_i64),
                eq(Decimal::new(1005, 1)),
                eq(Decimal::from(2)),
            )
            .times(1)
            .return_const(());

        assert_eq!(translate_trades(&mut sink, "BTC-PERP", Some(data.as_slice())).unwrap(), 1);
    }

    #[test]
    fn keeps_received_order() {
        let data = records(
            r#"[
                {"id":1,"price":10,"size":1,"side":"buy","liquidation":false,"time":"2023-01-01T00:00:01+00:00"},
                {"id":2,"price":11,"size":1,"side":"sell","liquidation":false,"time":"2023-01-01T00:00:00.500+00:00"}
            ]"#,
        );
        let mut sink = MockTradeSink::new();
        let mut seq = Sequence::new();

        for (price, ts) in [(10, 1_672_531_201_000_i64), (11, 1_672_531_200_500)] {
            sink.expect_emit_trade()
                .withf(move |_, t, p, _| *t == ts && *p == Decimal::from(price))
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }

        assert_eq!(translate_trades(&mut sink, "BTC-PERP", Some(data.as_slice())).unwrap(), 2);
    }

    #[test]
    fn absent_records_make_no_calls() {
        let mut sink = MockTradeSink::new();
        assert_eq!(translate_trades(&mut sink, "BTC-PERP", None).unwrap(), 0);
    }

    #[test]
    fn missing_size_is_fatal() {
        let data = records(r#"[{"price":1,"time":"2023-01-01T00:00:00Z"}]"#);
        let mut sink = MockTradeSink::new();

        let err = translate_trades(&mut sink, "BTC-PERP", Some(data.as_slice())).unwrap_err();
        assert!(matches!(err, CodecError::MissingField("size")));
    }

    #[test]
    fn bad_time_is_fatal_after_earlier_records() {
        let data = records(
            r#"[
                {"price":1,"size":1,"time":"2023-01-01T00:00:00Z"},
                {"price":1,"size":1,"time":"not a time"}
            ]"#,
        );
        let mut sink = MockTradeSink::new();
        sink.expect_emit_trade().times(1).return_const(());

        let err = translate_trades(&mut sink, "BTC-PERP", Some(data.as_slice())).unwrap_err();
        assert!(matches!(err, CodecError::InvalidTimestamp { .. }));
    }
}
