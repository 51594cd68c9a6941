use fcommon::CorrelationId;
use serde_json::json;

use crate::{DEFAULT_LOG_CAPACITY, LogLevel, Logger};

#[test]
fn every_level_appends_an_entry() {
    let logger = Logger::new();
    let id = CorrelationId::from("req-1");

    logger.debug("debugging", None, None);
    logger.info("sending", Some(json!({"attempt": 1})), Some(&id));
    logger.warn("slow", None, Some(&id));
    logger.error("failed", Some(json!({"status": 500})), Some(&id));

    let logs = logger.get_logs(None, 100);
    assert_eq!(logs.len(), 4);
    assert_eq!(logs[0].level, LogLevel::Error);
    assert_eq!(logs[0].data, Some(json!({"status": 500})));
    assert_eq!(logs[0].correlation_id.as_ref(), Some(&id));
    assert_eq!(logs[3].level, LogLevel::Debug);
    assert!(logs[3].correlation_id.is_none());
}

#[test]
fn ring_buffer_drops_oldest_entries_on_overflow() {
    let logger = Logger::with_capacity(3);
    for index in 0..5 {
        logger.info(format!("entry-{index}"), None, None);
    }

    let logs = logger.get_logs(None, 10);
    assert_eq!(logger.len(), 3);
    let messages = logs.iter().map(|entry| entry.message.as_str()).collect::<Vec<_>>();
    assert_eq!(messages, vec!["entry-4", "entry-3", "entry-2"]);
}

#[test]
fn default_capacity_is_one_thousand() {
    let logger = Logger::default();
    assert_eq!(logger.capacity(), DEFAULT_LOG_CAPACITY);
    assert_eq!(DEFAULT_LOG_CAPACITY, 1000);

    for index in 0..1005 {
        logger.debug(format!("entry-{index}"), None, None);
    }
    assert_eq!(logger.len(), 1000);
    assert_eq!(logger.get_logs(None, 1)[0].message, "entry-1004");
}

#[test]
fn get_logs_filters_by_level_and_respects_limit() {
    let logger = Logger::new();
    logger.warn("w1", None, None);
    logger.info("i1", None, None);
    logger.warn("w2", None, None);
    logger.warn("w3", None, None);

    let warnings = logger.get_logs(Some(LogLevel::Warn), 2);
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0].message, "w3");
    assert_eq!(warnings[1].message, "w2");
    assert!(logger.get_logs(Some(LogLevel::Error), 10).is_empty());
}

#[test]
fn error_rate_reflects_retained_window_only() {
    let logger = Logger::with_capacity(4);
    assert_eq!(logger.error_rate(), 0.0);

    logger.error("e1", None, None);
    logger.error("e2", None, None);
    logger.info("i1", None, None);
    logger.info("i2", None, None);
    assert_eq!(logger.error_rate(), 0.5);

    logger.info("i3", None, None);
    logger.info("i4", None, None);
    assert_eq!(logger.error_rate(), 0.0);
}

#[test]
fn clear_logs_empties_the_buffer() {
    let logger = Logger::new();
    logger.error("boom", None, None);
    logger.clear_logs();

    assert!(logger.is_empty());
    assert_eq!(logger.error_rate(), 0.0);
}

#[test]
fn entries_render_with_level_and_correlation_id() {
    let logger = Logger::new();
    let id = CorrelationId::from("req-9");
    logger.warn("retrying", Some(json!({"delay_ms": 1000})), Some(&id));

    let rendered = logger.get_logs(None, 1)[0].to_string();
    assert!(rendered.contains("WARN [req-9]: retrying"));
    assert!(rendered.contains("\"delay_ms\":1000"));
}

#[test]
fn level_parsing_accepts_aliases() {
    assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
    assert_eq!(LogLevel::parse(" error "), Some(LogLevel::Error));
    assert_eq!(LogLevel::parse("trace"), None);
}
