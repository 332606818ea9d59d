use crate::env::FormatterConfig;
use crate::formatter::CloudRunFormatter;
use crate::handler::StreamHandler;
use crate::level::Level;
use crate::record::LogRecord;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing_subscriber::fmt::MakeWriter;

/// Separator between logger name segments; matches `tracing` targets.
pub const NAME_SEPARATOR: &str = "::";

struct Logger {
    level: Level,
    handlers: Vec<StreamHandler>,
}

/// Named loggers and the handlers attached to them.
///
/// Logger names follow `tracing` targets: a record for target `app::db` is
/// delivered to the loggers named `app::db`, `app` and `""` (the root), each
/// applying its own level first.
pub struct LoggerRegistry {
    formatter: CloudRunFormatter,
    loggers: RwLock<HashMap<String, Logger>>,
}

/// Snapshot of a logger right after it was configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerHandle {
    name: String,
    level: Level,
}

impl LoggerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> &Level {
        &self.level
    }
}

impl LoggerRegistry {
    pub fn new(config: FormatterConfig) -> Self {
        Self {
            formatter: CloudRunFormatter::new(config),
            loggers: RwLock::new(HashMap::new()),
        }
    }

    /// Formatter shared by every handler this registry creates.
    pub fn formatter(&self) -> &CloudRunFormatter {
        &self.formatter
    }

    /// Attach a single stderr handler to logger `name`, replacing any
    /// handlers it already had. Both the logger and the handler get `level`,
    /// so configuring the same name twice leaves one handler and the
    /// latest level.
    pub fn setup_logger(&self, name: &str, level: Level) -> LoggerHandle {
        let handler = StreamHandler::stderr(self.formatter);
        self.replace_handlers(name, level, handler)
    }

    /// Same as [`setup_logger`](Self::setup_logger) with a custom stream.
    pub fn setup_logger_with_writer<W>(
        &self,
        name: &str,
        level: Level,
        make_writer: W,
    ) -> LoggerHandle
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let handler = StreamHandler::with_writer(self.formatter, make_writer);
        self.replace_handlers(name, level, handler)
    }

    fn replace_handlers(&self, name: &str, level: Level, handler: StreamHandler) -> LoggerHandle {
        let handler = handler.with_level(level.clone());
        let mut loggers = self.write();
        loggers.insert(
            name.to_string(),
            Logger {
                level: level.clone(),
                handlers: vec![handler],
            },
        );
        LoggerHandle {
            name: name.to_string(),
            level,
        }
    }

    /// Append a handler to logger `name` without touching existing ones.
    /// A logger created this way starts at [`Level::NotSet`].
    pub fn add_handler(&self, name: &str, handler: StreamHandler) {
        self.write()
            .entry(name.to_string())
            .or_insert_with(|| Logger {
                level: Level::NotSet,
                handlers: Vec::new(),
            })
            .handlers
            .push(handler);
    }

    /// Detach logger `name` and all of its handlers.
    pub fn remove_logger(&self, name: &str) -> bool {
        self.write().remove(name).is_some()
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.read().get(name).map_or(0, |logger| logger.handlers.len())
    }

    pub fn level(&self, name: &str) -> Option<Level> {
        self.read().get(name).map(|logger| logger.level.clone())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether any logger covering `target` would accept a record at `level`.
    pub fn enabled(&self, target: &str, level: &Level) -> bool {
        self.read().iter().any(|(name, logger)| {
            covers(name, target)
                && level.is_enabled_for(&logger.level)
                && logger.handlers.iter().any(|handler| handler.enabled(level))
        })
    }

    /// Deliver `record` to every logger covering `target`.
    ///
    /// A failing handler is reported on stderr and does not stop delivery
    /// to the remaining ones.
    pub fn dispatch(&self, target: &str, record: &LogRecord) {
        let loggers = self.read();
        for (name, logger) in loggers.iter() {
            if !covers(name, target) || !record.level.is_enabled_for(&logger.level) {
                continue;
            }
            for handler in &logger.handlers {
                if let Err(e) = handler.emit(record) {
                    eprintln!("log handler for `{}` failed: {}", name, e);
                }
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Logger>> {
        self.loggers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Logger>> {
        self.loggers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new(FormatterConfig::default())
    }
}

/// Whether logger `name` is `target` itself or one of its ancestors.
fn covers(name: &str, target: &str) -> bool {
    if name.is_empty() || name == target {
        return true;
    }
    target
        .strip_prefix(name)
        .is_some_and(|rest| rest.starts_with(NAME_SEPARATOR))
}
