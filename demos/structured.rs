use cloud_run_log_format::env::{ENVIRONMENT_ENV, STRUCTURED_ENVIRONMENTS};
use cloud_run_log_format::init::{init_global, setup_logger};
use cloud_run_log_format::Level;
use std::fmt;
use tracing::{error, info};

#[derive(Debug)]
struct UpstreamTimeout {
    service: &'static str,
}

impl fmt::Display for UpstreamTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} did not answer in time", self.service)
    }
}

impl std::error::Error for UpstreamTimeout {}

/// Run with `ENVIRONMENT=prod` to get Cloud Logging JSON lines; any other
/// value prints readable lines.
fn main() {
    if let Err(e) = init_global() {
        eprintln!("failed to install subscriber: {}", e);
        return;
    }
    setup_logger("structured", Level::Info);

    info!(
        environment = %std::env::var(ENVIRONMENT_ENV).unwrap_or_default(),
        structured_tiers = ?STRUCTURED_ENVIRONMENTS,
        "structured demo started"
    );

    info!(user_id = "123", request_id = "abc-xyz", "request accepted");

    let err = UpstreamTimeout { service: "billing" };
    error!(error = &err as &(dyn std::error::Error + 'static), "request failed");
    error!(severity = "critical", "giving up after retries");
}
