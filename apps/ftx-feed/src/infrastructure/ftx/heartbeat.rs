//! Keep-alive Manager
//!
//! FTX drops connections that stay silent, so the client sends
//! `{"op":"ping"}` on a fixed interval. The manager also watches inbound
//! traffic and reports a timeout when nothing has arrived for too long.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::codec::{CodecError, FtxCodec};
use super::messages::PingRequest;

/// Default interval between pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(5000);

/// Default inbound silence tolerated before the session is considered dead.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Build the keep-alive payload.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn ping_message() -> Result<String, CodecError> {
    FtxCodec::new().encode(&PingRequest::new())
}

/// Configuration for keep-alive behavior.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Interval between ping messages.
    pub ping_interval: Duration,
    /// Inbound silence before the connection is considered dead.
    pub idle_timeout: Duration,
    /// Text sent on every ping.
    pub ping_message: String,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PING_INTERVAL, DEFAULT_IDLE_TIMEOUT)
    }
}

impl KeepAliveConfig {
    /// Create a configuration sending the standard ping payload.
    #[must_use]
    pub fn new(ping_interval: Duration, idle_timeout: Duration) -> Self {
        Self {
            ping_interval,
            idle_timeout,
            ping_message: r#"{"op":"ping"}"#.to_string(),
        }
    }

    /// Replace the ping payload.
    #[must_use]
    pub fn with_ping_message(mut self, message: impl Into<String>) -> Self {
        self.ping_message = message.into();
        self
    }
}

/// Events emitted by the keep-alive manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeepAliveEvent {
    /// Send this ping payload.
    SendPing(String),
    /// No inbound traffic within the idle timeout.
    Timeout(Duration),
}

/// Inbound activity shared between the manager and the read loop.
#[derive(Debug)]
pub struct ActivityState {
    last_activity: RwLock<Instant>,
}

impl Default for ActivityState {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityState {
    /// Create state with activity recorded now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_activity: RwLock::new(Instant::now()),
        }
    }

    /// Record inbound traffic.
    pub fn record_activity(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Time since the last inbound traffic.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity.read().elapsed()
    }
}

/// Periodic ping sender and idle watchdog.
pub struct KeepAliveManager {
    config: KeepAliveConfig,
    state: Arc<ActivityState>,
    event_tx: mpsc::Sender<KeepAliveEvent>,
    cancel: CancellationToken,
}

impl KeepAliveManager {
    /// Create a new manager.
    #[must_use]
    pub const fn new(
        config: KeepAliveConfig,
        state: Arc<ActivityState>,
        event_tx: mpsc::Sender<KeepAliveEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            state,
            event_tx,
            cancel,
        }
    }

    /// Run until cancelled, the event channel closes, or a timeout fires.
    pub async fn run(self) {
        let start = tokio::time::Instant::now() + self.config.ping_interval;
        let mut interval = tokio::time::interval_at(start, self.config.ping_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("Keep-alive manager cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if self.check_and_ping().await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    /// Returns `Err(())` when the loop should exit.
    async fn check_and_ping(&self) -> Result<(), ()> {
        let idle = self.state.idle_for();
        if idle > self.config.idle_timeout {
            tracing::warn!(
                idle_ms = idle.as_millis(),
                timeout_ms = self.config.idle_timeout.as_millis(),
                "Idle timeout detected"
            );
            let _ = self.event_tx.send(KeepAliveEvent::Timeout(idle)).await;
            return Err(());
        }

        let ping = KeepAliveEvent::SendPing(self.config.ping_message.clone());
        if self.event_tx.send(ping).await.is_err() {
            tracing::debug!("Event channel closed, stopping keep-alive");
            return Err(());
        }

        Ok(())
    }
}
