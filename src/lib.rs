pub mod env;
pub mod error;
pub mod level;
pub mod record;
pub mod formatter;
pub mod handler;
pub mod registry;
pub mod layer;

pub mod init;

pub use env::{FormatterConfig, OutputMode};
pub use error::FormatError;
pub use formatter::CloudRunFormatter;
pub use layer::CloudRunLayer;
pub use level::{Level, Severity};
pub use record::{ExceptionInfo, LogRecord};
pub use registry::LoggerRegistry;
