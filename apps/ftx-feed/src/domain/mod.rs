//! Domain Layer - Normalized market data types.
//!
//! Vendor-neutral book and trade types with no knowledge of any exchange
//! wire format.

/// Book events, trades, sides and the delete marker.
pub mod market_data;
