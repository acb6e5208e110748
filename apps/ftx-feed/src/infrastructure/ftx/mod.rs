//! FTX WebSocket Adapters
//!
//! - **codec**: JSON parsing, message routing, frame assembly
//! - **book** / **trades**: payload translation into the sinks
//! - **feed**: per-connection entry point
//! - **subscription** / **heartbeat**: outbound requests and keep-alive
//! - **client**: one WebSocket session

pub mod book;
pub mod client;
pub mod codec;
pub mod feed;
pub mod heartbeat;
pub mod messages;
pub mod subscription;
pub mod trades;

pub use book::translate_book;
pub use client::{FtxClient, FtxClientConfig, FtxClientError};
pub use codec::{CodecError, FrameAssembler, FtxCodec, FtxMessage};
pub use feed::{FtxFeed, Processed};
pub use heartbeat::{
    ActivityState, DEFAULT_IDLE_TIMEOUT, DEFAULT_PING_INTERVAL, KeepAliveConfig, KeepAliveEvent,
    KeepAliveManager, ping_message,
};
pub use messages::*;
pub use subscription::{channels, subscribe_requests, unsubscribe_requests};
pub use trades::translate_trades;
