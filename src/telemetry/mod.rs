//! Telemetry
//!
//! Structured logging for token lifecycle operations.

pub mod logging;

pub use logging::{ApiKeysLogContext, InMemoryLogger, LogEntry, LogLevel, Logger, TracingLogger};
