mod common;

use cloud_run_log_format::formatter::SOURCE_LOCATION_KEY;
use cloud_run_log_format::{CloudRunLayer, FormatterConfig, Level, LoggerRegistry};
use common::Buffer;
use std::fmt;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

fn capture<F: FnOnce()>(config: FormatterConfig, level: Level, f: F) -> Buffer {
    let buffer = Buffer::default();
    let registry = Arc::new(LoggerRegistry::new(config));
    registry.setup_logger_with_writer("app", level, buffer.clone());

    let subscriber = Registry::default().with(CloudRunLayer::new(registry));
    tracing::subscriber::with_default(subscriber, f);
    buffer
}

#[derive(Debug)]
struct ConfigError {
    key: &'static str,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing config key {}", self.key)
    }
}

impl std::error::Error for ConfigError {}

#[test]
fn structured_event_carries_envelope_and_payload() {
    let buffer = capture(FormatterConfig::structured(), Level::Info, || {
        tracing::info!(target: "app", user_id = "123", request_id = "abc-xyz", attempt = 2, "Test message");
    });

    let entries = buffer.json_lines();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];

    assert_eq!(entry["severity"], "INFO");
    assert_eq!(entry["message"], "Test message");
    assert!(entry["time"].as_str().unwrap().ends_with('Z'));
    assert_eq!(entry[SOURCE_LOCATION_KEY]["file"], "layer_test.rs");
    assert!(entry[SOURCE_LOCATION_KEY]["line"].as_u64().unwrap() > 0);
    assert!(entry[SOURCE_LOCATION_KEY]["function"].is_null());
    assert_eq!(entry["payload"]["user_id"], "123");
    assert_eq!(entry["payload"]["request_id"], "abc-xyz");
    assert_eq!(entry["payload"]["attempt"], 2);
    assert!(entry.get("exception").is_none());
}

#[test]
fn readable_event_is_a_plain_line() {
    let buffer = capture(FormatterConfig::readable(), Level::Info, || {
        tracing::warn!(target: "app::http", user_id = "123", "slow response");
    });

    let lines = buffer.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("[WARNING] layer_test.rs:"), "{}", lines[0]);
    assert!(lines[0].ends_with(" - slow response"), "{}", lines[0]);
    assert!(!lines[0].contains("user_id"));
}

#[test]
fn events_below_logger_level_are_dropped() {
    let buffer = capture(FormatterConfig::readable(), Level::Warning, || {
        tracing::info!(target: "app", "ignored");
        tracing::error!(target: "app", "kept");
        tracing::error!(target: "other", "not ours");
    });

    let lines = buffer.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(" - kept"));
}

#[test]
fn severity_field_overrides_level() {
    let buffer = capture(FormatterConfig::structured(), Level::Info, || {
        tracing::error!(target: "app", severity = "critical", "disk full");
        tracing::info!(target: "app", severity = "loud", "unknown override");
    });

    let entries = buffer.json_lines();
    assert_eq!(entries[0]["severity"], "CRITICAL");
    assert!(entries[0].get("payload").is_none());
    assert_eq!(entries[1]["severity"], "INFO");
    assert_eq!(entries[1]["payload"]["severity"], "loud");
}

#[test]
fn trace_events_map_to_default_severity() {
    let buffer = capture(FormatterConfig::structured(), Level::NotSet, || {
        tracing::trace!(target: "app", "very detailed");
    });

    let entries = buffer.json_lines();
    assert_eq!(entries[0]["severity"], "DEFAULT");
}

#[test]
fn error_fields_become_exception_text() {
    let err = ConfigError { key: "DATABASE_URL" };
    let buffer = capture(FormatterConfig::structured(), Level::Info, || {
        tracing::error!(
            target: "app",
            error = &err as &(dyn std::error::Error + 'static),
            "startup failed"
        );
    });

    let entries = buffer.json_lines();
    let exception = entries[0]["exception"].as_str().unwrap();
    assert!(exception.contains("ConfigError"), "{exception}");
    assert!(exception.contains("missing config key DATABASE_URL"), "{exception}");
    assert!(entries[0].get("payload").is_none());
}

#[test]
fn innermost_span_is_reported_as_function() {
    let buffer = capture(FormatterConfig::structured(), Level::Info, || {
        let outer = tracing::info_span!(target: "app", "serve");
        let _outer = outer.enter();
        let inner = tracing::info_span!(target: "app", "handle_request");
        let _inner = inner.enter();
        tracing::info!(target: "app", "handled");
    });

    let entries = buffer.json_lines();
    assert_eq!(entries[0][SOURCE_LOCATION_KEY]["function"], "handle_request");
}

#[test]
fn every_line_is_single_line_json() {
    let buffer = capture(FormatterConfig::structured(), Level::Info, || {
        tracing::info!(target: "app", note = "line one\nline two", "multi\nline message");
    });

    let lines = buffer.lines();
    assert_eq!(lines.len(), 1);
    let entry: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(entry["message"], "multi\nline message");
    assert_eq!(entry["payload"]["note"], "line one\nline two");
}

#[test]
fn io_errors_are_named_by_kind() {
    let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "connection timed out");
    let buffer = capture(FormatterConfig::structured(), Level::Info, || {
        tracing::error!(
            target: "app",
            error = &err as &(dyn std::error::Error + 'static),
            "upstream call failed"
        );
    });

    let entries = buffer.json_lines();
    assert_eq!(
        entries[0]["exception"],
        "io::Error (TimedOut): connection timed out"
    );
}

#[test]
fn non_finite_floats_are_kept_as_text() {
    let buffer = capture(FormatterConfig::structured(), Level::Info, || {
        tracing::info!(target: "app", ratio = f64::NAN, limit = f64::INFINITY, share = 0.5, "ratios");
    });

    let entries = buffer.json_lines();
    assert_eq!(entries[0]["payload"]["ratio"], "NaN");
    assert_eq!(entries[0]["payload"]["limit"], "inf");
    assert_eq!(entries[0]["payload"]["share"], 0.5);
}

#[test]
fn debug_formatted_severity_still_overrides_level() {
    let buffer = capture(FormatterConfig::structured(), Level::Info, || {
        tracing::error!(target: "app", severity = ?"critical", "disk full");
    });

    let entries = buffer.json_lines();
    assert_eq!(entries[0]["severity"], "CRITICAL");
    assert!(entries[0].get("payload").is_none());
}
