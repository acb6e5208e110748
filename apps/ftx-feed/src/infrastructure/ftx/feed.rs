//! FTX Feed
//!
//! Per-connection entry point. Owns the frame assembler and replays each
//! completed message into a [`MarketDataSink`]. One feed per connection,
//! driven from a single task.

use super::book::translate_book;
use super::codec::{CodecError, FrameAssembler, FtxCodec, FtxMessage};
use super::messages::ControlMessage;
use super::trades::translate_trades;
use crate::application::ports::MarketDataSink;
use crate::domain::market_data::{BookKind, Selection};

/// Outcome of feeding one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// More fragments are needed before the message is complete.
    Pending,
    /// A book payload was translated.
    Book(BookKind),
    /// A trades payload was translated; holds the number of trades.
    Trades(usize),
    /// A control message carrying no market data.
    Control(ControlMessage),
    /// Unknown content, or a payload outside the selection.
    Ignored,
}

/// Message processor for one FTX connection.
#[derive(Debug)]
pub struct FtxFeed {
    selection: Selection,
    codec: FtxCodec,
    assembler: FrameAssembler,
}

impl FtxFeed {
    /// Create a feed processing the selected data kinds.
    #[must_use]
    pub const fn new(selection: Selection) -> Self {
        Self {
            selection,
            codec: FtxCodec::new(),
            assembler: FrameAssembler::new(),
        }
    }

    /// Data kinds this feed processes.
    #[must_use]
    pub const fn selection(&self) -> Selection {
        self.selection
    }

    /// Feed one fragment of a message.
    ///
    /// Nothing is parsed until `last` is set. The failing message is lost on
    /// error; the next call starts a fresh message.
    ///
    /// # Errors
    ///
    /// Returns an error if the completed message is malformed or violates
    /// the book level format.
    pub fn on_json<S>(&mut self, data: &str, last: bool, sink: &mut S) -> Result<Processed, CodecError>
    where
        S: MarketDataSink + ?Sized,
    {
        let Some(message) = self.assembler.push(data, last) else {
            return Ok(Processed::Pending);
        };

        let result = self.process(&message, sink);
        if result.is_err() {
            self.assembler.reset();
        }
        result
    }

    fn process<S>(&self, text: &str, sink: &mut S) -> Result<Processed, CodecError>
    where
        S: MarketDataSink + ?Sized,
    {
        let value = self.codec.parse(text)?;

        match self.codec.classify(&value)? {
            FtxMessage::Book { market, kind, data } => {
                if !self.selection.book() {
                    tracing::trace!(market, "Book payload outside selection");
                    return Ok(Processed::Ignored);
                }
                translate_book(sink, market, kind, data)?;
                Ok(Processed::Book(kind))
            }
            FtxMessage::Trades { market, data } => {
                if !self.selection.trades() {
                    tracing::trace!(market, "Trades payload outside selection");
                    return Ok(Processed::Ignored);
                }
                Ok(Processed::Trades(translate_trades(sink, market, data)?))
            }
            FtxMessage::Control(control) => Ok(Processed::Control(control)),
            FtxMessage::Ignored => Ok(Processed::Ignored),
        }
    }
}
