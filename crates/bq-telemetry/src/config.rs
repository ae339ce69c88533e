//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name stamped on the startup line
    pub service_name: String,

    /// Log filter directive (trace, debug, info, warn, error, or a full
    /// `EnvFilter` expression)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Include file and line in log lines
    pub source_locations: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "bq-access".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            source_locations: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BQ_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `BQ_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `BQ_LOG_SOURCE`: Include source locations (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();
        let defaults = Self::default();

        Self {
            service_name: defaults.service_name,

            log_level: lookup("BQ_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.log_level),

            json_logs: lookup("BQ_JSON_LOGS")
                .map(|v| is_truthy(&v))
                .unwrap_or(is_container),

            source_locations: lookup("BQ_LOG_SOURCE")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
        }
    }

    /// Applies `-v` flags: one forces `debug`, two or more force `trace`.
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        match verbose {
            0 => {}
            1 => self.log_level = "debug".to_string(),
            _ => self.log_level = "trace".to_string(),
        }
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
