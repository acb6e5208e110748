//! Feed Configuration Settings
//!
//! Configuration types for the feed, loaded from environment variables.
//!
//! | Variable               | Default             |
//! |------------------------|---------------------|
//! | `FTX_WS_URL`           | `wss://ftx.com/ws/` |
//! | `FTX_SYMBOLS`          | required            |
//! | `FTX_SELECTION`        | `level2,trades`     |
//! | `FTX_BOOK_DEPTH`       | `20`                |
//! | `FTX_PING_INTERVAL_MS` | `5000`              |
//! | `FTX_IDLE_TIMEOUT_MS`  | `15000`             |
//! | `FTX_METRICS_PORT`     | `9090` (0 = off)    |

use std::str::FromStr;
use std::time::Duration;

use crate::domain::market_data::{Instrument, Selection};
use crate::infrastructure::ftx::{DEFAULT_IDLE_TIMEOUT, DEFAULT_PING_INTERVAL};

/// Public FTX WebSocket endpoint.
pub const DEFAULT_WS_URL: &str = "wss://ftx.com/ws/";

const DEFAULT_SELECTION: &str = "level2,trades";

/// WebSocket connection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Endpoint URL.
    pub url: String,
    /// Interval between `{"op":"ping"}` messages.
    pub ping_interval: Duration,
    /// Inbound silence before the connection is considered dead.
    pub idle_timeout: Duration,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            ping_interval: DEFAULT_PING_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Prometheus metrics port (0 = recorder only, no listener).
    pub metrics_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { metrics_port: 9090 }
    }
}

/// Complete feed configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Markets to subscribe, in subscription order.
    pub instruments: Vec<Instrument>,
    /// Data kinds to subscribe and process.
    pub selection: Selection,
    /// Levels per side the event logger prints for each book event.
    pub book_depth: usize,
    /// WebSocket connection settings.
    pub websocket: WebSocketSettings,
    /// Server port settings.
    pub server: ServerSettings,
}

impl FeedConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `FTX_SYMBOLS` is missing or empty, or a variable
    /// holds an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`FeedConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let symbols =
            lookup("FTX_SYMBOLS").ok_or_else(|| ConfigError::MissingEnvVar("FTX_SYMBOLS".to_string()))?;
        let instruments: Vec<Instrument> = symbols
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if instruments.is_empty() {
            return Err(ConfigError::EmptyValue("FTX_SYMBOLS".to_string()));
        }

        let selection_raw = lookup("FTX_SELECTION").unwrap_or_else(|| DEFAULT_SELECTION.to_string());
        let selection = Selection::from_str(&selection_raw)
            .map_err(|e| ConfigError::invalid("FTX_SELECTION", &selection_raw, e))?;
        if selection.is_empty() {
            return Err(ConfigError::EmptyValue("FTX_SELECTION".to_string()));
        }

        let defaults = WebSocketSettings::default();
        let websocket = WebSocketSettings {
            url: lookup("FTX_WS_URL").unwrap_or(defaults.url),
            ping_interval: parse_or(&lookup, "FTX_PING_INTERVAL_MS", defaults.ping_interval, millis)?,
            idle_timeout: parse_or(&lookup, "FTX_IDLE_TIMEOUT_MS", defaults.idle_timeout, millis)?,
        };
        if websocket.ping_interval.is_zero() {
            return Err(ConfigError::invalid(
                "FTX_PING_INTERVAL_MS",
                "0",
                "interval must be positive",
            ));
        }

        let server = ServerSettings {
            metrics_port: parse_or(
                &lookup,
                "FTX_METRICS_PORT",
                ServerSettings::default().metrics_port,
                u16::from_str,
            )?,
        };

        Ok(Self {
            instruments,
            selection,
            book_depth: parse_or(&lookup, "FTX_BOOK_DEPTH", 20, usize::from_str)?,
            websocket,
            server,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
        /// Parse failure.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn millis(raw: &str) -> Result<Duration, std::num::ParseIntError> {
    raw.parse::<u64>().map(Duration::from_millis)
}

fn parse_or<T, E, L, P>(lookup: &L, key: &str, default: T, parse: P) -> Result<T, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Result<T, E>,
    E: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => parse(raw.trim()).map_err(|e| ConfigError::invalid(key, &raw, e)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<FeedConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        FeedConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_symbols_only() {
        let config = load(&[("FTX_SYMBOLS", "BTC-PERP, ETH-PERP")]).unwrap();

        assert_eq!(config.instruments, vec!["BTC-PERP", "ETH-PERP"]);
        assert_eq!(config.selection, Selection::new(false, true, true));
        assert_eq!(config.book_depth, 20);
        assert_eq!(config.websocket.url, DEFAULT_WS_URL);
        assert_eq!(config.websocket.ping_interval, Duration::from_millis(5000));
        assert_eq!(config.websocket.idle_timeout, Duration::from_millis(15_000));
        assert_eq!(config.server.metrics_port, 9090);
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("FTX_SYMBOLS", "SOL-PERP"),
            ("FTX_SELECTION", "trades"),
            ("FTX_WS_URL", "ws://127.0.0.1:9000"),
            ("FTX_PING_INTERVAL_MS", "250"),
            ("FTX_IDLE_TIMEOUT_MS", "1000"),
            ("FTX_METRICS_PORT", "0"),
            ("FTX_BOOK_DEPTH", "5"),
        ])
        .unwrap();

        assert_eq!(config.selection, Selection::new(false, false, true));
        assert_eq!(config.websocket.url, "ws://127.0.0.1:9000");
        assert_eq!(config.websocket.ping_interval, Duration::from_millis(250));
        assert_eq!(config.websocket.idle_timeout, Duration::from_secs(1));
        assert_eq!(config.server.metrics_port, 0);
        assert_eq!(config.book_depth, 5);
    }

    #[test]
    fn missing_symbols() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn blank_symbols() {
        assert!(matches!(
            load(&[("FTX_SYMBOLS", " , ")]),
            Err(ConfigError::EmptyValue(_))
        ));
    }

    #[test]
    fn unknown_selection() {
        let err = load(&[("FTX_SYMBOLS", "X"), ("FTX_SELECTION", "candles")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "FTX_SELECTION"));
    }

    #[test]
    fn non_numeric_interval() {
        let err = load(&[("FTX_SYMBOLS", "X"), ("FTX_PING_INTERVAL_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("FTX_PING_INTERVAL_MS"));
    }

    #[test]
    fn zero_interval_rejected() {
        assert!(load(&[("FTX_SYMBOLS", "X"), ("FTX_PING_INTERVAL_MS", "0")]).is_err());
    }
}
