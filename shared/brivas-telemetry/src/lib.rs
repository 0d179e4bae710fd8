//! Brivas Telemetry
//!
//! Logging setup and in-process metrics for the analyzer tools.

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{Counter, Gauge, Histogram, MetricsSnapshot};
pub use tracing_setup::init_tracing;

/// Initialize logging for a tool from the environment
pub fn init(service_name: &str) -> Result<TelemetryConfig, TelemetryError> {
    let config = TelemetryConfig::from_env(service_name);
    init_tracing(&config)?;
    Ok(config)
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Tracing initialization failed: {0}")]
    TracingInit(String),

    #[error("Metrics serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
