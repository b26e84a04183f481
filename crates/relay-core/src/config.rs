use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Bounded exponential back-off schedule for reconnects (§4.6).
pub const RECONNECT_INITIAL_SECS: u64 = 1;
pub const RECONNECT_FACTOR: u32 = 2;
pub const RECONNECT_CAP_SECS: u64 = 60;

/// Default minimum interval between calls in the `api_read` tier.
pub const DEFAULT_API_READ_INTERVAL_MS: u64 = 250;
/// Default minimum interval between calls in the `api_write` tier.
pub const DEFAULT_API_WRITE_INTERVAL_MS: u64 = 500;

/// Uniform retry cap applied to `RateLimited` responses (§9 open question,
/// resolved to K=3 — see DESIGN.md).
pub const RATE_LIMIT_RETRY_CAP: u32 = 3;

/// A flood-wait directive beyond this many seconds is reported to the
/// caller as `RateLimited` rather than slept through.
pub const FLOOD_WAIT_MAX_SECS: u64 = 60;

/// Default in-memory per-chat message buffer size (§9 open question,
/// resolved to a configurable default of 200).
pub const DEFAULT_MESSAGE_BUFFER_SIZE: usize = 200;

/// Default event/summary retention window, in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Default per-call request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Top-level configuration (`relay.toml` + `RELAY_*` env overrides),
/// mirroring `SkynetConfig::load`'s figment-based TOML+env layering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_api_read_interval_ms")]
    pub api_read_interval_ms: u64,
    #[serde(default = "default_api_write_interval_ms")]
    pub api_write_interval_ms: u64,
    #[serde(default = "default_retry_cap")]
    pub retry_cap: u32,
    #[serde(default = "default_flood_wait_max_secs")]
    pub flood_wait_max_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api_read_interval_ms: DEFAULT_API_READ_INTERVAL_MS,
            api_write_interval_ms: DEFAULT_API_WRITE_INTERVAL_MS,
            retry_cap: RATE_LIMIT_RETRY_CAP,
            flood_wait_max_secs: FLOOD_WAIT_MAX_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_message_buffer_size")]
    pub message_buffer_size: usize,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            message_buffer_size: DEFAULT_MESSAGE_BUFFER_SIZE,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_reconnect_initial_secs")]
    pub reconnect_initial_secs: u64,
    #[serde(default = "default_reconnect_cap_secs")]
    pub reconnect_cap_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            reconnect_initial_secs: RECONNECT_INITIAL_SECS,
            reconnect_cap_secs: RECONNECT_CAP_SECS,
        }
    }
}

/// Telegram-specific configuration. Only a bot token is required: the
/// reference adapter is Bot-API-based, so there is no
/// `api_id`/`api_hash`/session-string triad to carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Set once the setup wizard completes; absent before then.
    pub bot_token: Option<String>,
}

fn default_data_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.relay/telegram", home)
}
fn default_api_read_interval_ms() -> u64 {
    DEFAULT_API_READ_INTERVAL_MS
}
fn default_api_write_interval_ms() -> u64 {
    DEFAULT_API_WRITE_INTERVAL_MS
}
fn default_retry_cap() -> u32 {
    RATE_LIMIT_RETRY_CAP
}
fn default_flood_wait_max_secs() -> u64 {
    FLOOD_WAIT_MAX_SECS
}
fn default_message_buffer_size() -> usize {
    DEFAULT_MESSAGE_BUFFER_SIZE
}
fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_reconnect_initial_secs() -> u64 {
    RECONNECT_INITIAL_SECS
}
fn default_reconnect_cap_secs() -> u64 {
    RECONNECT_CAP_SECS
}

impl SkillConfig {
    /// Load from an explicit TOML path (falling back to
    /// `<data_dir>/config.toml`) merged with `RELAY_*` env overrides,
    /// following `SkynetConfig::load`'s pattern.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: SkillConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("RELAY_").split("_"))
            .extract()
            .map_err(|e| crate::error::SkillError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.relay/telegram/config.toml", home)
}
