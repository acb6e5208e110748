//! Application Layer - Sink ports and services.
//!
//! The ports are the contracts translators emit into; the services are the
//! in-crate implementations of those contracts.

/// Quote and trade sink interfaces.
pub mod ports;

/// Sink implementations used by feed sessions.
pub mod services;
