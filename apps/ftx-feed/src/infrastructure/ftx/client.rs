//! FTX WebSocket Client
//!
//! Runs one session against the FTX public stream: subscribe, keep the
//! connection alive, translate every message into [`FeedEvent`]s, and
//! unsubscribe on shutdown. Reconnection is left to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use super::codec::{CodecError, FtxCodec};
use super::feed::{FtxFeed, Processed};
use super::heartbeat::{ActivityState, KeepAliveConfig, KeepAliveEvent, KeepAliveManager};
use super::messages::{ControlMessage, SubscriptionRequest};
use super::subscription::{subscribe_requests, unsubscribe_requests};
use crate::application::services::EventCollector;
use crate::domain::market_data::{FeedEvent, Instrument, Selection};
use crate::infrastructure::config::FeedConfig;
use crate::infrastructure::metrics;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that end an FTX session.
#[derive(Debug, thiserror::Error)]
pub enum FtxClientError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Outbound message could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Nothing received within the idle timeout.
    #[error("no message received for {0:?}")]
    IdleTimeout(Duration),

    /// Event receiver dropped.
    #[error("channel send error")]
    ChannelSend,

    /// Connection closed by the server.
    #[error("connection closed")]
    ConnectionClosed,
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the FTX client.
#[derive(Debug, Clone)]
pub struct FtxClientConfig {
    /// WebSocket URL.
    pub url: String,
    /// Markets to subscribe.
    pub instruments: Vec<Instrument>,
    /// Data kinds to subscribe and process.
    pub selection: Selection,
    /// Keep-alive configuration.
    pub keep_alive: KeepAliveConfig,
}

impl FtxClientConfig {
    /// Create a configuration with the default keep-alive.
    #[must_use]
    pub fn new(url: impl Into<String>, instruments: Vec<Instrument>, selection: Selection) -> Self {
        Self {
            url: url.into(),
            instruments,
            selection,
            keep_alive: KeepAliveConfig::default(),
        }
    }

    /// Replace the keep-alive configuration.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

impl From<&FeedConfig> for FtxClientConfig {
    fn from(config: &FeedConfig) -> Self {
        Self::new(
            config.websocket.url.clone(),
            config.instruments.clone(),
            config.selection,
        )
        .with_keep_alive(KeepAliveConfig::new(
            config.websocket.ping_interval,
            config.websocket.idle_timeout,
        ))
    }
}

// =============================================================================
// FTX Client
// =============================================================================

/// WebSocket client for FTX market data.
pub struct FtxClient {
    config: FtxClientConfig,
    codec: FtxCodec,
    event_tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
}

impl FtxClient {
    /// Create a new client.
    #[must_use]
    pub const fn new(
        config: FtxClientConfig,
        event_tx: mpsc::Sender<FeedEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            codec: FtxCodec::new(),
            event_tx,
            cancel,
        }
    }

    /// Connect and process messages until cancelled or the session fails.
    ///
    /// A single malformed message never ends the session; it is logged and
    /// forwarded as [`FeedEvent::Error`].
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails, closes, or goes idle, or
    /// the event receiver is dropped.
    pub async fn run(&self) -> Result<(), FtxClientError> {
        tracing::info!(url = %self.config.url, "Connecting to FTX stream");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.config.url).await?;
        let (write, read) = ws_stream.split();

        metrics::set_connections(1.0);
        let result = self.session(write, read).await;
        metrics::set_connections(0.0);

        match &result {
            Ok(()) => tracing::info!("FTX session closed gracefully"),
            Err(e) => tracing::warn!(error = %e, "FTX session ended"),
        }
        let _ = self.event_tx.send(FeedEvent::Disconnected).await;

        result
    }

    async fn session<W, R>(&self, mut write: W, mut read: R) -> Result<(), FtxClientError>
    where
        W: Sink<Message, Error = tungstenite::Error> + Unpin,
        R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        let subscriptions = subscribe_requests(self.config.selection, &self.config.instruments);
        self.send_requests(&mut write, &subscriptions).await?;
        self.emit(FeedEvent::Connected).await?;

        let activity = Arc::new(ActivityState::new());
        let (keep_alive_tx, mut keep_alive_rx) = mpsc::channel::<KeepAliveEvent>(10);
        let keep_alive_cancel = self.cancel.child_token();
        let _keep_alive_guard = keep_alive_cancel.clone().drop_guard();
        tokio::spawn(
            KeepAliveManager::new(
                self.config.keep_alive.clone(),
                Arc::clone(&activity),
                keep_alive_tx,
                keep_alive_cancel,
            )
            .run(),
        );

        let mut feed = FtxFeed::new(self.config.selection);
        let mut collector = EventCollector::new();

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::info!("FTX client cancelled, unsubscribing");
                    let requests =
                        unsubscribe_requests(self.config.selection, &self.config.instruments);
                    self.send_requests(&mut write, &requests).await?;
                    write.send(Message::Close(None)).await?;
                    return Ok(());
                }
                Some(event) = keep_alive_rx.recv() => {
                    match event {
                        KeepAliveEvent::SendPing(ping) => {
                            write.send(Message::Text(ping.into())).await?;
                        }
                        KeepAliveEvent::Timeout(idle) => {
                            return Err(FtxClientError::IdleTimeout(idle));
                        }
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            activity.record_activity();
                            self.handle_text(&mut feed, &mut collector, text.as_str()).await?;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            activity.record_activity();
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            activity.record_activity();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Server sent close frame");
                            return Err(FtxClientError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            tracing::info!("WebSocket stream ended");
                            return Err(FtxClientError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }

    /// Translate one text message and forward what it produced.
    ///
    /// Events completed before a failure are forwarded ahead of the error.
    async fn handle_text(
        &self,
        feed: &mut FtxFeed,
        collector: &mut EventCollector,
        text: &str,
    ) -> Result<(), FtxClientError> {
        let started = Instant::now();
        metrics::record_message_received();

        let result = feed.on_json(text, true, collector);
        metrics::record_processing_duration(started.elapsed());

        for event in collector.drain() {
            match &event {
                FeedEvent::Book(book) => metrics::record_book_event(book.kind),
                FeedEvent::Trade(_) => metrics::record_trades(1),
                _ => {}
            }
            self.emit(event).await?;
        }

        match result {
            Ok(Processed::Control(control)) => self.handle_control(control).await,
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "Dropping FTX message");
                metrics::record_message_error(e.kind());
                self.emit(FeedEvent::Error(e.to_string())).await
            }
        }
    }

    async fn handle_control(&self, control: ControlMessage) -> Result<(), FtxClientError> {
        match control {
            ControlMessage::Pong => {
                tracing::trace!("Pong received");
                Ok(())
            }
            ControlMessage::Subscribed { channel, market } => {
                tracing::debug!(?channel, ?market, "Subscription confirmed");
                Ok(())
            }
            ControlMessage::Unsubscribed { channel, market } => {
                tracing::debug!(?channel, ?market, "Unsubscription confirmed");
                Ok(())
            }
            ControlMessage::Info { code, msg } => {
                tracing::debug!(?code, %msg, "FTX info");
                Ok(())
            }
            ControlMessage::Error { code, msg } => {
                tracing::error!(?code, %msg, "FTX error");
                metrics::record_message_error("exchange_error");
                self.emit(FeedEvent::Error(msg)).await
            }
        }
    }

    async fn send_requests<W>(
        &self,
        write: &mut W,
        requests: &[SubscriptionRequest],
    ) -> Result<(), FtxClientError>
    where
        W: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        for request in requests {
            let json = self.codec.encode(request)?;
            tracing::debug!(
                op = ?request.op,
                channel = request.channel.as_str(),
                market = %request.market,
                "Sending subscription request"
            );
            write.send(Message::Text(json.into())).await?;
        }
        Ok(())
    }

    async fn emit(&self, event: FeedEvent) -> Result<(), FtxClientError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| FtxClientError::ChannelSend)
    }
}
