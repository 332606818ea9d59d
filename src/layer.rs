use crate::level::Level;
use crate::record::{ExceptionInfo, LogRecord, UNKNOWN_FILE};
use crate::registry::LoggerRegistry;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Event field that overrides the level taken from the `tracing` macro,
/// e.g. `error!(severity = "critical", "disk full")`.
pub const SEVERITY_FIELD: &str = "severity";

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// hands them to a [`LoggerRegistry`].
///
/// Work happens synchronously on the calling thread: the event is captured,
/// formatted and written before the `tracing` macro returns. Events no
/// registered logger is interested in are dropped before formatting.
pub struct CloudRunLayer {
    registry: Arc<LoggerRegistry>,
}

impl CloudRunLayer {
    pub fn new(registry: Arc<LoggerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<LoggerRegistry> {
        &self.registry
    }
}

impl<S> Layer<S> for CloudRunLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut severity: Option<String> = None;
        let mut exception: Option<ExceptionInfo> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
            severity: &mut severity,
            exception: &mut exception,
        };
        event.record(&mut visitor);

        let level = match severity {
            Some(name) => match name.parse::<Level>() {
                Ok(level) => level,
                Err(_) => {
                    fields.insert(SEVERITY_FIELD.to_string(), serde_json::Value::String(name));
                    Level::from(meta.level())
                }
            },
            None => Level::from(meta.level()),
        };

        if !self.registry.enabled(meta.target(), &level) {
            return;
        }

        // Innermost span, which for `#[instrument]`ed code is the function name.
        let function = ctx
            .event_scope(event)
            .and_then(|mut scope| scope.next())
            .map(|span| span.name().to_string());

        let record = LogRecord {
            timestamp: Utc::now(),
            level,
            message: message.unwrap_or_default(),
            file: meta.file().map_or_else(|| UNKNOWN_FILE.to_string(), file_name),
            line: meta.line().unwrap_or(0),
            function,
            exception,
            fields,
        };

        self.registry.dispatch(meta.target(), &record);
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Captures `tracing` event fields into the pieces of a [`LogRecord`].
///
/// `message` and `severity` are pulled out, the first field recorded as an
/// error becomes the exception, and everything else lands in `fields`.
/// Values only available through `Debug` are stored as strings, so captured
/// fields are always serializable.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
    pub severity: &'a mut Option<String>,
    pub exception: &'a mut Option<ExceptionInfo>,
}

impl<'a> FieldVisitor<'a> {
    fn insert(&mut self, field: &Field, value: serde_json::Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => *self.message = Some(value.to_string()),
            SEVERITY_FIELD => *self.severity = Some(value.to_string()),
            _ => self.insert(field, serde_json::Value::String(value.to_string())),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // JSON has no NaN or infinity; keep them as text rather than null.
        if value.is_finite() {
            self.insert(field, serde_json::Value::from(value));
        } else {
            self.insert(field, serde_json::Value::String(value.to_string()));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, serde_json::Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.exception.is_none() {
            *self.exception = Some(ExceptionInfo::from_dyn_error(value));
        } else {
            self.insert(field, serde_json::Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => *self.message = Some(format!("{:?}", value)),
            SEVERITY_FIELD => {
                let name = format!("{:?}", value);
                *self.severity = Some(name.trim_matches('"').to_string());
            }
            _ => self.insert(field, serde_json::Value::String(format!("{:?}", value))),
        }
    }
}
