use crate::error::FormatError;
use crate::formatter::CloudRunFormatter;
use crate::level::Level;
use crate::record::LogRecord;
use std::fmt;
use std::io::Write;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;

/// Writes formatted records to a single output stream.
///
/// A handler owns exactly one [`CloudRunFormatter`] and one stream. Records
/// below the handler level are skipped; everything else is written as one
/// line. Formatting problems are folded into the line via
/// [`CloudRunFormatter::format_or_fallback`], so only I/O failures surface
/// as errors.
pub struct StreamHandler {
    formatter: CloudRunFormatter,
    level: Level,
    writer: BoxMakeWriter,
}

impl StreamHandler {
    /// Handler writing to standard error.
    pub fn stderr(formatter: CloudRunFormatter) -> Self {
        Self::with_writer(formatter, std::io::stderr)
    }

    pub fn stdout(formatter: CloudRunFormatter) -> Self {
        Self::with_writer(formatter, std::io::stdout)
    }

    /// Handler writing to any [`MakeWriter`]; a fresh writer is requested
    /// for every line.
    pub fn with_writer<W>(formatter: CloudRunFormatter, make_writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self {
            formatter,
            level: Level::NotSet,
            writer: BoxMakeWriter::new(make_writer),
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    pub fn formatter(&self) -> &CloudRunFormatter {
        &self.formatter
    }

    pub fn enabled(&self, level: &Level) -> bool {
        level.is_enabled_for(&self.level)
    }

    /// Format `record` and write it, followed by a newline.
    pub fn emit(&self, record: &LogRecord) -> Result<(), FormatError> {
        if !self.enabled(&record.level) {
            return Ok(());
        }

        let mut line = self.formatter.format_or_fallback(record);
        line.push('\n');

        let mut writer = self.writer.make_writer();
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Debug for StreamHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandler")
            .field("formatter", &self.formatter)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}
