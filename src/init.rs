use crate::env::FormatterConfig;
use crate::layer::CloudRunLayer;
use crate::level::Level;
use crate::registry::{LoggerHandle, LoggerRegistry};
use std::sync::{Arc, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::Registry;

/// Configuration for [`init_tracing_with_config`].
///
/// **Fields**
/// - `formatter`: output mode shared by every handler of the registry.
/// - `root_level`: if set, the root logger (`""`) gets a stderr handler at
///   this level, so every target is logged without further setup.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub formatter: FormatterConfig,
    pub root_level: Option<Level>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            formatter: FormatterConfig::default(),
            root_level: Some(Level::Info),
        }
    }
}

impl LayerConfig {
    /// Default configuration with the output mode read from `ENVIRONMENT`.
    pub fn from_env() -> Self {
        Self {
            formatter: FormatterConfig::from_env(),
            ..Self::default()
        }
    }
}

/// Install `Registry::default().with(CloudRunLayer)` as the global default
/// subscriber, dispatching through `registry`.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(registry: Arc<LoggerRegistry>) -> Result<(), TryInitError> {
    Registry::default()
        .with(CloudRunLayer::new(registry))
        .try_init()
}

/// Build a registry from `config`, install it globally and return it so
/// loggers can be configured afterwards.
pub fn init_tracing_with_config(
    config: LayerConfig,
) -> Result<Arc<LoggerRegistry>, TryInitError> {
    let registry = Arc::new(LoggerRegistry::new(config.formatter));
    if let Some(level) = config.root_level {
        registry.setup_logger("", level);
    }
    init_tracing(Arc::clone(&registry))?;
    Ok(registry)
}

static GLOBAL_REGISTRY: OnceLock<Arc<LoggerRegistry>> = OnceLock::new();

/// Process-wide registry. Its output mode is read from `ENVIRONMENT` the
/// first time this is called and never re-evaluated.
pub fn global_registry() -> &'static Arc<LoggerRegistry> {
    GLOBAL_REGISTRY.get_or_init(|| Arc::new(LoggerRegistry::new(FormatterConfig::from_env())))
}

/// Install the [`global_registry`] as the global `tracing` subscriber.
pub fn init_global() -> Result<(), TryInitError> {
    init_tracing(Arc::clone(global_registry()))
}

/// Configure logger `name` on the [`global_registry`] with exactly one
/// stderr handler at `level`, replacing whatever was attached before.
pub fn setup_logger(name: &str, level: Level) -> LoggerHandle {
    global_registry().setup_logger(name, level)
}

/// [`setup_logger`] at [`Level::Info`].
pub fn setup_logger_default(name: &str) -> LoggerHandle {
    setup_logger(name, Level::Info)
}
