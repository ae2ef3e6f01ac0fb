use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};

/// Configuration surface, one field per key in the external interfaces
/// table. Loaded from a TOML file plus `TOOTIK_*` environment overrides,
/// the same way the teacher loads `AppConfig`.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Our canonical host; used in all locally minted IDs.
    pub domain: String,

    pub db_path: PathBuf,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_max_delivery_attempts")]
    pub max_delivery_attempts: u32,

    #[serde(default = "default_max_delivery_queue_size")]
    pub max_delivery_queue_size: u32,

    #[serde(default = "default_max_forwarding_depth")]
    pub max_forwarding_depth: u32,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_edit_throttle_unit")]
    pub edit_throttle_unit: Duration,

    #[serde(default = "default_edit_throttle_factor")]
    pub edit_throttle_factor: f64,

    #[serde(default = "default_max_posts_length")]
    pub max_posts_length: u32,

    #[serde(default = "default_max_invites_per_user")]
    pub max_invites_per_user: u32,

    #[serde(default)]
    pub require_invitation: bool,

    #[serde(default = "default_resolver_max_idle_conns")]
    pub resolver_max_idle_conns: u32,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_resolver_idle_conn_timeout")]
    pub resolver_idle_conn_timeout: Duration,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_feed_update_interval")]
    pub feed_update_interval: Duration,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_request_timeout")]
    pub gemini_request_timeout: Duration,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_request_timeout")]
    pub guppy_request_timeout: Duration,

    #[serde(default)]
    pub use_ed25519_keys: bool,

    /// Path to the blocklist CSV, reloaded by [`crate::blocklist::Blocklist`].
    pub blocklist_path: Option<PathBuf>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_max_delivery_attempts() -> u32 {
    10
}
fn default_max_delivery_queue_size() -> u32 {
    128
}
fn default_max_forwarding_depth() -> u32 {
    3
}
fn default_edit_throttle_unit() -> Duration {
    Duration::from_secs(60)
}
fn default_edit_throttle_factor() -> f64 {
    4.0
}
fn default_max_posts_length() -> u32 {
    5000
}
fn default_max_invites_per_user() -> u32 {
    5
}
fn default_resolver_max_idle_conns() -> u32 {
    16
}
fn default_resolver_idle_conn_timeout() -> Duration {
    Duration::from_secs(30)
}
fn default_feed_update_interval() -> Duration {
    Duration::from_secs(60)
}
fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

pub const MAX_DELIVERY_DELAY: Duration = Duration::from_secs(24 * 60 * 60);
pub const DELIVERY_BACKOFF_BASE: Duration = Duration::from_secs(60);
pub const INBOX_RETRY_MAX_ATTEMPTS: u32 = 10;
pub const RESOLVER_DEPTH_LIMIT: u32 = 8;
pub const CLOCK_SKEW_TOLERANCE: Duration = Duration::from_secs(12 * 60 * 60);
pub const DELIVERY_WORKERS_PER_HOST: usize = 4;
pub const DELIVERY_WORKERS_GLOBAL: usize = 64;
pub const RESOLVER_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

impl Config {
    pub fn from_file_and_env(path: &str) -> Result<Self, ConfigError> {
        ConfigLoader::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("tootik"))
            .build()
            .and_then(|cfg| cfg.try_deserialize::<Self>())
    }
}
