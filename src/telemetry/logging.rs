//! Logging
//!
//! Structured log events for token lifecycle operations. Secrets never go
//! through here; contexts carry ids, operation names and counts only.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::types::TokenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Fields attached to a log event.
#[derive(Debug, Clone, Default)]
pub struct ApiKeysLogContext {
    /// `fetch_all`, `revoke_token`, ...
    pub operation: Option<String>,
    pub token_id: Option<TokenId>,
    /// Counts and codes, rendered as `key=value` pairs in key order.
    pub extra: BTreeMap<String, String>,
}

impl ApiKeysLogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn token_id(mut self, id: TokenId) -> Self {
        self.token_id = Some(id);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.extra.insert(key.into(), value.to_string());
        self
    }

    fn render_extra(&self) -> String {
        self.extra
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Logger interface. Implementors provide `log`; the per-level methods
/// forward to it.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, context: &ApiKeysLogContext);

    fn is_enabled(&self, level: LogLevel) -> bool;

    fn trace(&self, message: &str, context: &ApiKeysLogContext) {
        self.log(LogLevel::Trace, message, context);
    }

    fn debug(&self, message: &str, context: &ApiKeysLogContext) {
        self.log(LogLevel::Debug, message, context);
    }

    fn info(&self, message: &str, context: &ApiKeysLogContext) {
        self.log(LogLevel::Info, message, context);
    }

    fn warn(&self, message: &str, context: &ApiKeysLogContext) {
        self.log(LogLevel::Warn, message, context);
    }

    fn error(&self, message: &str, context: &ApiKeysLogContext) {
        self.log(LogLevel::Error, message, context);
    }
}

/// Event captured by [`InMemoryLogger`].
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub context: ApiKeysLogContext,
    pub timestamp: DateTime<Utc>,
}

/// Logger that keeps events in memory, for assertions in tests.
pub struct InMemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
    min_level: LogLevel,
}

impl InMemoryLogger {
    pub fn new() -> Self {
        Self::with_level(LogLevel::Trace)
    }

    /// Drop events below `min_level`.
    pub fn with_level(min_level: LogLevel) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            min_level,
        }
    }

    pub fn get_entries(&self) -> Vec<LogEntry> {
        self.entries().clone()
    }

    pub fn get_entries_by_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for InMemoryLogger {
    fn log(&self, level: LogLevel, message: &str, context: &ApiKeysLogContext) {
        if !self.is_enabled(level) {
            return;
        }
        self.entries().push(LogEntry {
            level,
            message: message.to_string(),
            context: context.clone(),
            timestamp: Utc::now(),
        });
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }
}

/// Logger emitting `tracing` events under the `apikeys` target, with the
/// context as event fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

macro_rules! emit {
    ($level:expr, $message:expr, $context:expr) => {
        tracing::event!(
            target: "apikeys",
            $level,
            operation = $context.operation.as_deref().unwrap_or(""),
            token_id = $context.token_id,
            extra = %$context.render_extra(),
            "{}",
            $message
        )
    };
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, context: &ApiKeysLogContext) {
        // `event!` needs the level as a constant.
        match level {
            LogLevel::Trace => emit!(tracing::Level::TRACE, message, context),
            LogLevel::Debug => emit!(tracing::Level::DEBUG, message, context),
            LogLevel::Info => emit!(tracing::Level::INFO, message, context),
            LogLevel::Warn => emit!(tracing::Level::WARN, message, context),
            LogLevel::Error => emit!(tracing::Level::ERROR, message, context),
        }
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Trace => tracing::enabled!(target: "apikeys", tracing::Level::TRACE),
            LogLevel::Debug => tracing::enabled!(target: "apikeys", tracing::Level::DEBUG),
            LogLevel::Info => tracing::enabled!(target: "apikeys", tracing::Level::INFO),
            LogLevel::Warn => tracing::enabled!(target: "apikeys", tracing::Level::WARN),
            LogLevel::Error => tracing::enabled!(target: "apikeys", tracing::Level::ERROR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_conversion() {
        assert_eq!(tracing::Level::from(LogLevel::Warn), tracing::Level::WARN);
        assert_eq!(tracing::Level::from(LogLevel::Trace), tracing::Level::TRACE);
        assert!(LogLevel::Error > LogLevel::Info);
    }

    #[test]
    fn test_in_memory_logger() {
        let logger = InMemoryLogger::new();
        let context = ApiKeysLogContext::new()
            .operation("revoke_token")
            .token_id(2);

        logger.info("Revoke requested", &context);
        logger.error("Revoke failed", &context);

        let entries = logger.get_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].context.token_id, Some(2));
        assert_eq!(logger.get_entries_by_level(LogLevel::Error).len(), 1);
    }

    #[test]
    fn test_context_extra_rendered_in_key_order() {
        let context = ApiKeysLogContext::new()
            .operation("fetch_all")
            .extra("count", 3)
            .extra("active", 2);

        assert_eq!(context.extra.get("count"), Some(&"3".to_string()));
        assert_eq!(context.render_extra(), "active=2 count=3");
    }

    #[test]
    fn test_min_level_filtering() {
        let logger = InMemoryLogger::with_level(LogLevel::Warn);
        let context = ApiKeysLogContext::new();

        logger.debug("debug", &context);
        logger.info("info", &context);
        logger.warn("warn", &context);
        logger.log(LogLevel::Error, "error", &context);

        assert_eq!(logger.get_entries().len(), 2);
        assert!(!logger.is_enabled(LogLevel::Info));
    }

    #[test]
    fn test_tracing_logger_accepts_all_levels() {
        let context = ApiKeysLogContext::new().operation("fetch_all").token_id(1);
        TracingLogger.trace("t", &context);
        TracingLogger.info("i", &context);
        TracingLogger.error("e", &context);
    }
}
