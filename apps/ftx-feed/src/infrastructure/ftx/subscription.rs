//! Subscription Requests
//!
//! Builds the outbound requests for a selection and a list of markets.
//! One request per channel per market; book channels first, then trades,
//! markets in the order supplied.

use super::messages::{Channel, Op, SubscriptionRequest};
use crate::domain::market_data::Selection;

/// Channels a selection needs, in request order.
#[must_use]
pub fn channels(selection: Selection) -> Vec<Channel> {
    let mut channels = Vec::with_capacity(2);
    if selection.book() {
        channels.push(Channel::Orderbook);
    }
    if selection.trades() {
        channels.push(Channel::Trades);
    }
    channels
}

/// Subscribe requests for every selected channel of every market.
#[must_use]
pub fn subscribe_requests<S: AsRef<str>>(
    selection: Selection,
    instruments: &[S],
) -> Vec<SubscriptionRequest> {
    requests(Op::Subscribe, selection, instruments)
}

/// Unsubscribe requests mirroring [`subscribe_requests`].
#[must_use]
pub fn unsubscribe_requests<S: AsRef<str>>(
    selection: Selection,
    instruments: &[S],
) -> Vec<SubscriptionRequest> {
    requests(Op::Unsubscribe, selection, instruments)
}

fn requests<S: AsRef<str>>(
    op: Op,
    selection: Selection,
    instruments: &[S],
) -> Vec<SubscriptionRequest> {
    channels(selection)
        .into_iter()
        .flat_map(|channel| {
            instruments.iter().map(move |market| SubscriptionRequest {
                op,
                channel,
                market: market.as_ref().to_string(),
            })
        })
        .collect()
}
