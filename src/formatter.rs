use crate::env::{FormatterConfig, OutputMode};
use crate::error::FormatError;
use crate::level::Severity;
use crate::record::LogRecord;
use chrono::SecondsFormat;
use serde::Serialize;
use std::collections::BTreeMap;

/// Key Cloud Logging reads the source location from.
pub const SOURCE_LOCATION_KEY: &str = "logging.googleapis.com/sourceLocation";

/// Renders [`LogRecord`]s as Cloud Logging JSON lines or readable lines.
///
/// The output mode is fixed when the formatter is built; formatting itself
/// is a pure function of the record, so a formatter can be shared freely
/// across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloudRunFormatter {
    mode: OutputMode,
}

impl CloudRunFormatter {
    pub fn new(config: FormatterConfig) -> Self {
        Self { mode: config.mode }
    }

    pub fn structured() -> Self {
        Self::new(FormatterConfig::structured())
    }

    pub fn readable() -> Self {
        Self::new(FormatterConfig::readable())
    }

    /// Build a formatter whose mode is taken from the `ENVIRONMENT` variable
    /// as it is right now.
    pub fn from_env() -> Self {
        Self::new(FormatterConfig::from_env())
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Format a record according to the configured mode.
    pub fn format(&self, record: &LogRecord) -> Result<String, FormatError> {
        match self.mode {
            OutputMode::Structured => self.format_structured(record),
            OutputMode::Readable => Ok(self.format_readable(record)),
        }
    }

    /// Like [`format`](Self::format), but never fails: on error the record
    /// is rendered as a readable line with the error appended.
    pub fn format_or_fallback(&self, record: &LogRecord) -> String {
        match self.format(record) {
            Ok(line) => line,
            Err(err) => self.fallback_line(record, &err),
        }
    }

    fn fallback_line(&self, record: &LogRecord, err: &FormatError) -> String {
        format!("{} [format error: {}]", self.format_readable(record), err)
    }

    /// `[<LEVEL>] <file>:<line> - <message>`
    pub fn format_readable(&self, record: &LogRecord) -> String {
        format!(
            "[{}] {}:{} - {}",
            record.level, record.file, record.line, record.message
        )
    }

    /// Single-line JSON object in the shape the Cloud Logging agent parses.
    ///
    /// Extra fields are nested under `payload` so they can never shadow
    /// envelope keys.
    pub fn format_structured(&self, record: &LogRecord) -> Result<String, FormatError> {
        let exception = record.rendered_exception();
        let entry = StructuredEntry {
            severity: record.level.severity(),
            message: &record.message,
            time: record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            source_location: SourceLocation {
                file: &record.file,
                line: record.line,
                function: record.function.as_deref(),
            },
            exception: exception.as_deref(),
            payload: &record.fields,
        };
        Ok(serde_json::to_string(&entry)?)
    }
}

#[derive(Serialize)]
struct StructuredEntry<'a> {
    severity: Severity,
    message: &'a str,
    time: String,
    #[serde(rename = "logging.googleapis.com/sourceLocation")]
    source_location: SourceLocation<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<&'a str>,
    #[serde(skip_serializing_if = "no_fields")]
    payload: &'a BTreeMap<String, serde_json::Value>,
}

fn no_fields(fields: &&BTreeMap<String, serde_json::Value>) -> bool {
    fields.is_empty()
}

#[derive(Serialize)]
struct SourceLocation<'a> {
    file: &'a str,
    line: u32,
    /// `null` when the function is unknown.
    function: Option<&'a str>,
}
