//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete transport, configuration and observability around the
//! translation core.

/// FTX WebSocket adapters (codec, translators, client).
pub mod ftx;

/// Configuration loading.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;
