use crate::error::FormatError;
use crate::level::Level;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;

/// File name used when an event carries no source location.
pub const UNKNOWN_FILE: &str = "<unknown>";

/// A single log event as handed to the formatter.
///
/// Records are built by the caller (or by [`CloudRunLayer`](crate::layer::CloudRunLayer)
/// from a `tracing` event) and are never mutated by formatting. Extra,
/// event-specific context lives in `fields` and is kept apart from the
/// fixed attributes so the two can never collide.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    /// Bare file name, without directories.
    pub file: String,
    pub line: u32,
    pub function: Option<String>,
    pub exception: Option<ExceptionInfo>,
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogRecord {
    /// Create a record stamped with the current time and an unknown location.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            file: UNKNOWN_FILE.to_string(),
            line: 0,
            function: None,
            exception: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }

    pub fn in_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn at_time(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    /// Attach an already-built JSON value as an extra field.
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Serialize `value` and attach it as an extra field.
    ///
    /// Values that cannot be represented as JSON (maps with non-string keys,
    /// failing `Serialize` impls) are rejected here instead of being dropped
    /// later during formatting.
    pub fn with_field<T>(self, key: impl Into<String>, value: &T) -> Result<Self, FormatError>
    where
        T: Serialize + ?Sized,
    {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => Ok(self.with_value(key, value)),
            Err(source) => Err(FormatError::Field { key, source }),
        }
    }

    pub fn rendered_exception(&self) -> Option<String> {
        self.exception.as_ref().map(ExceptionInfo::render)
    }
}

/// Captured error data attached to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
    /// `Display` text of each error in the `source()` chain, outermost first.
    pub causes: Vec<String>,
    pub backtrace: Option<String>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            causes: Vec::new(),
            backtrace: None,
        }
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    pub fn with_backtrace(mut self, backtrace: impl Into<String>) -> Self {
        self.backtrace = Some(backtrace.into());
        self
    }

    /// Capture an error and its `source()` chain.
    ///
    /// The type name comes from the static type when it is concrete, looking
    /// through `Box`, `Arc`, `Rc` and references. For trait objects it is
    /// recovered from the leading identifier of the `Debug` output, falling
    /// back to `"Error"`.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: Error + ?Sized,
    {
        let type_name = short_type_name(std::any::type_name::<E>())
            .or_else(|| debug_type_name(&format!("{:?}", error)))
            .unwrap_or_else(|| "Error".to_string());
        Self::capture(type_name, error)
    }

    /// Capture a type-erased error, as handed over by `tracing`.
    ///
    /// `std::io::Error` has no useful `Debug` prefix, so it is recognized by
    /// downcasting and named `io::Error (<kind>)`.
    pub fn from_dyn_error(error: &(dyn Error + 'static)) -> Self {
        match error.downcast_ref::<std::io::Error>() {
            Some(io) => Self::capture(format!("io::Error ({:?})", io.kind()), error),
            None => Self::from_error(error),
        }
    }

    fn capture<E>(type_name: String, error: &E) -> Self
    where
        E: Error + ?Sized,
    {
        let mut info = Self::new(type_name, error.to_string());
        let mut source = error.source();
        while let Some(cause) = source {
            info.causes.push(cause.to_string());
            source = cause.source();
        }
        info
    }

    /// Render the trace text emitted under the `exception` key.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(backtrace) = self.backtrace.as_deref().map(str::trim_end) {
            if !backtrace.is_empty() {
                out.push_str(backtrace);
                out.push('\n');
            }
        }
        out.push_str(&self.type_name);
        out.push_str(": ");
        out.push_str(&self.message);
        for cause in &self.causes {
            out.push_str("\nCaused by: ");
            out.push_str(cause);
        }
        out
    }
}

/// Pointer types whose name says nothing about the error they hold.
const WRAPPER_TYPES: &[&str] = &["Box", "Arc", "Rc"];

fn short_type_name(full: &str) -> Option<String> {
    let full = full.trim();
    if let Some(inner) = full.strip_prefix('&') {
        return short_type_name(inner.trim_start_matches("mut "));
    }
    if full.starts_with("dyn ") {
        return None;
    }

    let (path, generics) = match full.split_once('<') {
        Some((path, rest)) => (path, rest.strip_suffix('>')),
        None => (full, None),
    };
    let name = path.rsplit("::").next().unwrap_or(path);

    match generics {
        Some(inner) if WRAPPER_TYPES.contains(&name) => short_type_name(inner),
        _ => Some(name.to_string()),
    }
}

fn debug_type_name(debug: &str) -> Option<String> {
    let ident: String = debug
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    match ident.chars().next() {
        Some(first) if first.is_ascii_uppercase() => Some(ident),
        _ => None,
    }
}
