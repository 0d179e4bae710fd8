//! Telemetry Configuration

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "brivas-analyzer".to_string(),
            log_level: "warn".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// `SERVICE_NAME`, `RUST_LOG` and `JSON_LOGS`, falling back to
    /// `service_name`, `warn` and plain text. Command line tools print
    /// their results on stdout, so the default level stays quiet.
    pub fn from_env(service_name: &str) -> Self {
        Self {
            service_name: std::env::var("SERVICE_NAME").unwrap_or_else(|_| service_name.to_string()),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
            json_logs: std::env::var("JSON_LOGS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}
