//! Application configuration loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;

use crate::spinner::SpinPolicy;

/// Longest poll interval the spin loop accepts (one second).
const MAX_POLL_INTERVAL_US: u64 = 1_000_000;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    // === Spin Behaviour ===
    /// Sleep between spin loop polls, in microseconds.
    #[serde(default = "default_poll_interval_us")]
    pub spin_poll_interval_us: u64,

    /// Largest `spin_time` a caller may request, in seconds.
    #[serde(default = "default_max_spin_seconds")]
    pub max_spin_seconds: f64,

    /// What a new `/spin` does with tasks started by earlier calls.
    #[serde(default)]
    pub spin_policy: SpinPolicy,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,

    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,
}

fn default_port() -> u16 {
    8080
}

fn default_poll_interval_us() -> u64 {
    100
}

fn default_max_spin_seconds() -> f64 {
    3600.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            spin_poll_interval_us: default_poll_interval_us(),
            max_spin_seconds: default_max_spin_seconds(),
            spin_policy: SpinPolicy::default(),
            rust_log: default_log_level(),
            verbose: false,
            log_json: false,
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
        if self.spin_poll_interval_us == 0 {
            return Err("SPIN_POLL_INTERVAL_US must be greater than 0".to_string());
        }

        if self.spin_poll_interval_us > MAX_POLL_INTERVAL_US {
            return Err(format!(
                "SPIN_POLL_INTERVAL_US must be at most {}",
                MAX_POLL_INTERVAL_US
            ));
        }

        if !self.max_spin_seconds.is_finite() || self.max_spin_seconds <= 0.0 {
            return Err("MAX_SPIN_SECONDS must be a positive number".to_string());
        }

        Ok(())
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.spin_poll_interval_us)
    }

    /// Maximum spin time as a [`Duration`].
    pub fn max_spin_time(&self) -> Duration {
        Duration::from_secs_f64(self.max_spin_seconds)
    }
}
