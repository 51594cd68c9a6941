//! Bounded, leveled log sink shared by every component of a session.
//!
//! Entries are retained in a ring buffer for in-process diagnostics and also
//! forwarded to `tracing`, which is the console-equivalent sink.
//!
//! ```rust
//! use fobserve::{LogLevel, Logger};
//!
//! let logger = Logger::with_capacity(2);
//! logger.info("first", None, None);
//! logger.warn("second", None, None);
//! logger.error("third", None, None);
//!
//! let recent = logger.get_logs(None, 10);
//! assert_eq!(recent.len(), 2);
//! assert_eq!(recent[0].message, "third");
//! assert_eq!(recent[0].level, LogLevel::Error);
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use fcommon::CorrelationId;
use serde_json::Value;

use crate::entry::{LogEntry, LogLevel};

pub const DEFAULT_LOG_CAPACITY: usize = 1000;

#[derive(Debug)]
pub struct Logger {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn debug(
        &self,
        message: impl Into<String>,
        data: Option<Value>,
        correlation_id: Option<&CorrelationId>,
    ) {
        self.log(LogLevel::Debug, message, data, correlation_id);
    }

    pub fn info(
        &self,
        message: impl Into<String>,
        data: Option<Value>,
        correlation_id: Option<&CorrelationId>,
    ) {
        self.log(LogLevel::Info, message, data, correlation_id);
    }

    pub fn warn(
        &self,
        message: impl Into<String>,
        data: Option<Value>,
        correlation_id: Option<&CorrelationId>,
    ) {
        self.log(LogLevel::Warn, message, data, correlation_id);
    }

    pub fn error(
        &self,
        message: impl Into<String>,
        data: Option<Value>,
        correlation_id: Option<&CorrelationId>,
    ) {
        self.log(LogLevel::Error, message, data, correlation_id);
    }

    pub fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        data: Option<Value>,
        correlation_id: Option<&CorrelationId>,
    ) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            data,
            correlation_id: correlation_id.cloned(),
        };

        emit(&entry);
        metrics::counter!("webchat_log_entries_total", "level" => level.as_str()).increment(1);

        let mut entries = self.entries();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Most recent entries first, optionally restricted to one level.
    pub fn get_logs(&self, level: Option<LogLevel>, limit: usize) -> Vec<LogEntry> {
        self.entries()
            .iter()
            .rev()
            .filter(|entry| level.is_none_or(|wanted| entry.level == wanted))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Share of retained entries at error level. Evicted entries do not count.
    pub fn error_rate(&self) -> f64 {
        let entries = self.entries();
        if entries.is_empty() {
            return 0.0;
        }

        let errors = entries
            .iter()
            .filter(|entry| entry.level == LogLevel::Error)
            .count();
        errors as f64 / entries.len() as f64
    }

    pub fn clear_logs(&self) {
        self.entries().clear();
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn emit(entry: &LogEntry) {
    let correlation_id = entry.correlation_id.as_ref().map(|id| id.as_str());
    let data = entry.data.as_ref().map(|value| value.to_string());
    let data = data.as_deref();
    let message = entry.message.as_str();

    match entry.level {
        LogLevel::Debug => tracing::debug!(correlation_id, data, "{message}"),
        LogLevel::Info => tracing::info!(correlation_id, data, "{message}"),
        LogLevel::Warn => tracing::warn!(correlation_id, data, "{message}"),
        LogLevel::Error => tracing::error!(correlation_id, data, "{message}"),
    }
}
