//! # Configuration
//!
//! Client configuration: API location, logging, cache and timeout settings.

pub mod client;

pub use client::{Config, ConfigError, LogFormat, LoggingConfig};
