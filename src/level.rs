use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Severity of a [`LogRecord`](crate::record::LogRecord).
///
/// The canonical levels are ordered by their numeric value. `Other` covers
/// level names outside the canon (tracing's `TRACE`, application-defined
/// levels); they keep their name for readable output and fall back to
/// [`Severity::Default`] in structured output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Level {
    NotSet,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Other { name: String, value: u32 },
}

impl Level {
    /// Numeric value used for threshold comparisons.
    pub fn value(&self) -> u32 {
        match self {
            Level::NotSet => 0,
            Level::Debug => 10,
            Level::Info => 20,
            Level::Warning => 30,
            Level::Error => 40,
            Level::Critical => 50,
            Level::Other { value, .. } => *value,
        }
    }

    /// Upper-case level name as printed in readable output.
    pub fn name(&self) -> &str {
        match self {
            Level::NotSet => "NOTSET",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Other { name, .. } => name,
        }
    }

    /// Whether a record at `self` passes a threshold of `threshold`.
    pub fn is_enabled_for(&self, threshold: &Level) -> bool {
        self.value() >= threshold.value()
    }

    pub fn severity(&self) -> Severity {
        Severity::from(self)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level `{0}`")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOTSET" | "DEFAULT" => Ok(Level::NotSet),
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" | "FATAL" => Ok(Level::Critical),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Level::Other {
                name: "TRACE".to_string(),
                value: 5,
            },
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warning,
            _ => Level::Error,
        }
    }
}

/// Severity label understood by Cloud Logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Default,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Default => "DEFAULT",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl From<&Level> for Severity {
    fn from(level: &Level) -> Self {
        match level {
            Level::Debug => Severity::Debug,
            Level::Info => Severity::Info,
            Level::Warning => Severity::Warning,
            Level::Error => Severity::Error,
            Level::Critical => Severity::Critical,
            Level::NotSet | Level::Other { .. } => Severity::Default,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
