use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct LogEvent<'a> {
    level: &'a str,
    event: &'a str,
    message: &'a str,
    timestamp_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
}

/// `log` backend writing one JSON object per line.
struct JsonLogger {
    level: LevelFilter,
}

impl Log for JsonLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            emit(record.level(), record.target(), &record.args().to_string(), None);
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    }
}

/// Install the JSON logger. Unparseable levels fall back to `warn`; a second
/// call keeps the first logger.
pub fn init(level: &str) -> LevelFilter {
    let level = level.trim().parse().unwrap_or(LevelFilter::Warn);
    if log::set_boxed_logger(Box::new(JsonLogger { level })).is_ok() {
        log::set_max_level(level);
    }
    level
}

/// Structured event with a metadata object, filtered like any other record.
pub fn event(level: Level, event: &str, message: &str, metadata: Value) {
    if level <= log::max_level() {
        emit(level, event, message, Some(metadata));
    }
}

fn emit(level: Level, event: &str, message: &str, metadata: Option<Value>) {
    let label = level.as_str().to_ascii_lowercase();
    let entry = LogEvent {
        level: &label,
        event,
        message,
        timestamp_ms: current_timestamp_ms(),
        metadata,
    };

    match serde_json::to_string(&entry) {
        // stdout carries the table
        Ok(payload) if level <= Level::Warn => eprintln!("{payload}"),
        Ok(payload) => println!("{payload}"),
        Err(err) => eprintln!(
            "{{\"level\":\"error\",\"event\":\"logging_failure\",\"message\":\"failed to serialise log\",\"error\":\"{err}\"}}"
        ),
    }
}

fn current_timestamp_ms() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_installs_logger_and_parses_level() {
        assert_eq!(init("error"), LevelFilter::Error);
        assert_eq!(init("shouting"), LevelFilter::Warn);
        assert_eq!(log::max_level(), LevelFilter::Error);
    }

    #[test]
    fn log_event_serialises_without_empty_metadata() {
        let entry = LogEvent {
            level: "warn",
            event: "poll.failed",
            message: "refresh failed",
            timestamp_ms: 1,
            metadata: None,
        };
        let payload = serde_json::to_string(&entry).expect("serialise");
        assert_eq!(
            payload,
            r#"{"level":"warn","event":"poll.failed","message":"refresh failed","timestamp_ms":1}"#
        );
    }
}
