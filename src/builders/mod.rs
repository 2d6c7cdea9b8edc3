//! Builders
//!
//! Fluent builder patterns for API key configuration.

pub mod config;

pub use config::{apikeys_config, ApiKeysConfigBuilder};
