use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub pms: PmsConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub resiliency: ResiliencyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Drafts are kept in memory when no URL is configured.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PmsConfig {
    pub base_url: String,
    #[serde(default = "default_pms_timeout")]
    pub timeout_seconds: u64,
}

fn default_pms_timeout() -> u64 { 15 }

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    #[serde(default = "default_draft_ttl")]
    pub draft_ttl_seconds: u64,
    /// How often expired drafts and idle draft locks are swept.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_draft_ttl() -> u64 { 3600 }
fn default_sweep_interval() -> u64 { 60 }

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            draft_ttl_seconds: default_draft_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResiliencyConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: usize,
    #[serde(default = "default_reset_timeout")]
    pub reset_timeout_seconds: u64,
}

fn default_failure_threshold() -> usize { 5 }
fn default_reset_timeout() -> u64 { 30 }

impl Default for ResiliencyConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_seconds: default_reset_timeout(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `ARBOREAL__PMS__BASE_URL=https://pms.example.com`
            .add_source(config::Environment::with_prefix("ARBOREAL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
