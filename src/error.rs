/// Error type returned when a record cannot be turned into an output line
/// or the line cannot be written.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("extra field `{key}` is not JSON-serializable: {source}")]
    Field {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write log line: {0}")]
    Io(#[from] std::io::Error),
}
