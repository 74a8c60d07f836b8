//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use strum::{Display, EnumString};

use crate::sweep::FailurePolicy;

/// Where computation results come from, chosen once for the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Default)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ComputeMode {
    /// Relay every request upstream using per-call credential headers.
    #[default]
    Relay,
    /// Answer with the offline estimator; no upstream calls, no credentials.
    Offline,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding `index.html` and other static assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    // === Computation ===
    /// Compute mode: relay or offline.
    #[serde(default = "default_compute_mode")]
    pub compute_mode: String,

    /// Sweep failure policy: fail-fast or fallback.
    #[serde(default = "default_failure_policy")]
    pub sweep_failure_policy: String,

    /// Per-call upstream timeout in seconds.
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,

    // === Observability ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,

    /// Install the Prometheus recorder and expose `/metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_port() -> u16 {
    8000
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_compute_mode() -> String {
    "relay".to_string()
}

fn default_failure_policy() -> String {
    "fail-fast".to_string()
}

fn default_upstream_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            static_dir: default_static_dir(),
            compute_mode: default_compute_mode(),
            sweep_failure_policy: default_failure_policy(),
            upstream_timeout_secs: default_upstream_timeout(),
            rust_log: default_log_level(),
            verbose: false,
            log_json: false,
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.upstream_timeout_secs == 0 {
            return Err("UPSTREAM_TIMEOUT_SECS must be greater than 0".to_string());
        }

        if self.static_dir.trim().is_empty() {
            return Err("STATIC_DIR must not be empty".to_string());
        }

        self.compute_mode()?;
        self.failure_policy()?;

        Ok(())
    }

    /// Parsed compute mode.
    pub fn compute_mode(&self) -> Result<ComputeMode, String> {
        ComputeMode::from_str(self.compute_mode.trim()).map_err(|_| {
            format!(
                "COMPUTE_MODE must be 'relay' or 'offline', got '{}'",
                self.compute_mode
            )
        })
    }

    /// Parsed sweep failure policy.
    pub fn failure_policy(&self) -> Result<FailurePolicy, String> {
        FailurePolicy::from_str(self.sweep_failure_policy.trim()).map_err(|_| {
            format!(
                "SWEEP_FAILURE_POLICY must be 'fail-fast' or 'fallback', got '{}'",
                self.sweep_failure_policy
            )
        })
    }

    /// Upstream timeout as a duration.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}
