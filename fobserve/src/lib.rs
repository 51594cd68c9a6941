//! Leveled structured logging with an in-process ring buffer.
//!
//! ```rust
//! use fobserve::{LogLevel, Logger};
//!
//! let logger = Logger::new();
//! logger.error("provider unavailable", None, None);
//! logger.info("recovered", None, None);
//!
//! assert_eq!(logger.get_logs(Some(LogLevel::Error), 10).len(), 1);
//! assert_eq!(logger.error_rate(), 0.5);
//! ```

mod entry;
mod logger;

pub use entry::{LogEntry, LogLevel};
pub use logger::{DEFAULT_LOG_CAPACITY, Logger};

pub mod prelude {
    pub use crate::{DEFAULT_LOG_CAPACITY, LogEntry, LogLevel, Logger};
}

#[cfg(test)]
mod tests;
