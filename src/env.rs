//! Environment variable names and values used to pick the output mode.
//!
//! These are purely helpers; the formatter itself never touches the
//! environment and receives its mode through [`FormatterConfig`].

/// Deployment tier of the running process, e.g. `prod` or `devo`.
pub const ENVIRONMENT_ENV: &str = "ENVIRONMENT";

/// Tier assumed when [`ENVIRONMENT_ENV`] is unset.
pub const DEFAULT_ENVIRONMENT: &str = "devo";

/// Tiers that switch the formatter to structured JSON output. Matched
/// case-insensitively; every other value selects readable output.
pub const STRUCTURED_ENVIRONMENTS: &[&str] = &["prod", "staging", "gamma"];

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Output shape produced by the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// One JSON object per line, for the Cloud Logging ingestion agent.
    Structured,
    /// `[LEVEL] file:line - message`, for a developer terminal.
    #[default]
    Readable,
}

impl OutputMode {
    /// Map a deployment tier name onto an output mode.
    pub fn for_environment(environment: &str) -> Self {
        let environment = environment.trim();
        if STRUCTURED_ENVIRONMENTS
            .iter()
            .any(|tier| tier.eq_ignore_ascii_case(environment))
        {
            OutputMode::Structured
        } else {
            OutputMode::Readable
        }
    }

    /// Resolve the mode from [`ENVIRONMENT_ENV`], defaulting to
    /// [`DEFAULT_ENVIRONMENT`].
    pub fn from_env() -> Self {
        Self::for_environment(&env_or(ENVIRONMENT_ENV, DEFAULT_ENVIRONMENT))
    }
}

/// Formatter configuration, resolved once by the caller (typically at
/// process startup) and handed to every formatter it builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatterConfig {
    pub mode: OutputMode,
}

impl FormatterConfig {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn structured() -> Self {
        Self::new(OutputMode::Structured)
    }

    pub fn readable() -> Self {
        Self::new(OutputMode::Readable)
    }

    /// Read [`ENVIRONMENT_ENV`] once and capture the resulting mode.
    pub fn from_env() -> Self {
        Self::new(OutputMode::from_env())
    }
}
