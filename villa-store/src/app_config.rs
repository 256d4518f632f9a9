use serde::Deserialize;
use std::env;
use villa_core::otp::{CANCELLATION_TTL_SECONDS, REGISTRATION_TTL_SECONDS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub database: Option<DatabaseConfig>,
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub booking: BookingRules,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests: i64,
    pub window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { requests: 100, window_seconds: 60 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OtpConfig {
    pub registration_ttl_seconds: u64,
    pub cancellation_ttl_seconds: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            registration_ttl_seconds: REGISTRATION_TTL_SECONDS,
            cancellation_ttl_seconds: CANCELLATION_TTL_SECONDS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    /// Recompute the stay price from the nightly rate and reject mismatches.
    #[serde(default = "default_true")]
    pub verify_price: bool,
    /// Refuse bookings that share a day with an existing stay.
    #[serde(default = "default_true")]
    pub reject_overlaps: bool,
    /// Longest stay accepted, in nights.
    #[serde(default = "default_max_nights")]
    pub max_nights: i64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self { verify_price: true, reject_overlaps: true, max_nights: default_max_nights() }
    }
}

fn default_true() -> bool { true }

fn default_max_nights() -> i64 { 365 }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    Background,
    Inline,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    #[serde(default)]
    pub mode: DispatchMode,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    pub smtp: Option<SmtpConfig>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { mode: DispatchMode::Background, timeout_ms: default_timeout_ms(), smtp: None }
    }
}

fn default_timeout_ms() -> u64 { 5000 }

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_port() -> u16 { 587 }
fn default_from_name() -> String { "Villa Bookings".to_string() }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `VILLA_DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("VILLA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
