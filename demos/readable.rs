use cloud_run_log_format::init::{init_tracing_with_config, LayerConfig};
use cloud_run_log_format::Level;
use tracing::{info, instrument, warn};

#[instrument]
fn load_profile(user_id: u64) {
    info!(user_id, "loading profile");
    warn!(user_id, cache = "miss", "profile not cached");
}

fn main() {
    let config = LayerConfig {
        root_level: None,
        ..LayerConfig::default()
    };
    let registry = match init_tracing_with_config(config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("failed to install subscriber: {}", e);
            return;
        }
    };

    registry.setup_logger("readable", Level::Debug);

    info!("starting readable demo");
    load_profile(42);
    tracing::debug!("debug output is enabled for this target");
}
