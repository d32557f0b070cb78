use std::env;
use std::str::FromStr;

use crate::session::{DEFAULT_ALERT_COOLDOWN_MS, DEFAULT_SEISMIC_THRESHOLD};
use crate::window::{DEFAULT_MAX_SAMPLES, DEFAULT_WINDOW_MS, WindowConfig};

#[derive(Debug, Clone)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Chart windows
    pub storage_dir: Option<String>,
    pub window_ms: i64,
    pub max_samples: usize,
    pub reject_non_finite_samples: bool,

    // Redraw timers
    pub standard_refresh_ms: u64,
    pub high_frequency_refresh_ms: u64,
    pub event_channel_capacity: usize,

    // Seismic alert
    pub seismic_threshold: f64,
    pub alert_cooldown_ms: i64,

    // Station backend
    pub station_api_url: Option<String>,
    pub station_timeout_seconds: u64,
    pub vapid_public_key: Option<String>,
    pub report_cache_ttl_seconds: u64,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Rate limiting
    pub disable_rate_limiting: bool,
    pub rate_limit_ingest_per_second: u64,
    pub rate_limit_ingest_burst: u32,

    // Application metadata
    pub deployment: Deployment,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Convert a `WINDOW_MINUTES` setting to milliseconds.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` if `minutes` is not positive or the
/// duration does not fit in an `i64` of milliseconds.
pub fn window_ms_from_minutes(minutes: i64) -> Result<i64, ConfigError> {
    if minutes <= 0 {
        return Err(ConfigError::Invalid("WINDOW_MINUTES", "must be positive"));
    }
    minutes
        .checked_mul(60_000)
        .ok_or(ConfigError::Invalid("WINDOW_MINUTES", "too large"))
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every setting has a default matching the reference station, so an
    /// empty environment yields a working local dashboard.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a setting is present but out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let window_ms =
            window_ms_from_minutes(env_or("WINDOW_MINUTES", DEFAULT_WINDOW_MS / 60_000))?;

        let max_samples: usize = env_or("MAX_SAMPLES", DEFAULT_MAX_SAMPLES);
        if max_samples == 0 {
            return Err(ConfigError::Invalid("MAX_SAMPLES", "must be positive"));
        }

        let standard_refresh_ms: u64 = env_or("STANDARD_REFRESH_MS", 2000);
        let high_frequency_refresh_ms: u64 = env_or("HIGH_FREQUENCY_REFRESH_MS", 100);
        if standard_refresh_ms == 0 || high_frequency_refresh_ms == 0 {
            return Err(ConfigError::Invalid("*_REFRESH_MS", "must be positive"));
        }

        Ok(Self {
            // Chart windows
            storage_dir: env_opt("STORAGE_DIR"),
            window_ms,
            max_samples,
            reject_non_finite_samples: env_or("REJECT_NON_FINITE_SAMPLES", false),

            // Redraw timers
            standard_refresh_ms,
            high_frequency_refresh_ms,
            event_channel_capacity: env_or("EVENT_CHANNEL_CAPACITY", 1024),

            // Seismic alert
            seismic_threshold: env_or("SEISMIC_THRESHOLD", DEFAULT_SEISMIC_THRESHOLD),
            alert_cooldown_ms: env_or("ALERT_COOLDOWN_MS", DEFAULT_ALERT_COOLDOWN_MS),

            // Station backend
            station_api_url: env_opt("STATION_API_URL").map(|u| u.trim_end_matches('/').to_string()),
            station_timeout_seconds: env_or("STATION_TIMEOUT_SECONDS", 120), // report generation is slow
            vapid_public_key: env_opt("VAPID_PUBLIC_KEY"),
            report_cache_ttl_seconds: env_or("REPORT_CACHE_TTL_SECONDS", 3600),

            // API settings
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env_or("API_PORT", 5000),

            // Rate limiting
            disable_rate_limiting: env_or("DISABLE_RATE_LIMITING", false),
            rate_limit_ingest_per_second: env_or("RATE_LIMIT_INGEST_PER_SECOND", 50),
            rate_limit_ingest_burst: env_or("RATE_LIMIT_INGEST_BURST", 200),

            // Application metadata
            deployment: Deployment::from_str(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
        })
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    #[must_use]
    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            window_ms: self.window_ms,
            max_samples: self.max_samples,
            reject_non_finite: self.reject_non_finite_samples,
        }
    }
}

impl Default for Config {
    /// Reference values with in-memory storage, no station backend and rate
    /// limiting disabled.
    fn default() -> Self {
        Self {
            storage_dir: None,
            window_ms: DEFAULT_WINDOW_MS,
            max_samples: DEFAULT_MAX_SAMPLES,
            reject_non_finite_samples: false,
            standard_refresh_ms: 2000,
            high_frequency_refresh_ms: 100,
            event_channel_capacity: 1024,
            seismic_threshold: DEFAULT_SEISMIC_THRESHOLD,
            alert_cooldown_ms: DEFAULT_ALERT_COOLDOWN_MS,
            station_api_url: None,
            station_timeout_seconds: 120,
            vapid_public_key: None,
            report_cache_ttl_seconds: 3600,
            api_host: "127.0.0.1".to_string(),
            api_port: 5000,
            disable_rate_limiting: true,
            rate_limit_ingest_per_second: 50,
            rate_limit_ingest_burst: 200,
            deployment: Deployment::Local,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    Invalid(&'static str, &'static str),
}
