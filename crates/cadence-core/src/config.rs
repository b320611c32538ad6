use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default seconds between manager ticks.
pub const DEFAULT_TICK_SECS: u64 = 60;
/// Default per-call budget for collaborator requests.
pub const DEFAULT_COLLABORATOR_TIMEOUT_MS: u64 = 30_000;

/// Top-level config (cadence.toml + CADENCE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CadenceConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub manager: ManagerConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Publish targets, one webhook endpoint per channel name.
    #[serde(default)]
    pub channels: Vec<WebhookChannelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Background job-manager settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Seconds between pipeline ticks.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
        }
    }
}

/// Content-generation collaborator endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Base URL (without trailing slash) of the generation service.
    #[serde(default = "default_generator_base_url")]
    pub base_url: String,
    /// Optional bearer token for the generation service.
    pub api_key: Option<String>,
    /// Per-request timeout. Mandatory — a hung collaborator must become a
    /// failed per-item outcome, never a hung tick.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_generator_base_url(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// A single publish target: posts for this channel name are delivered to
/// `url` as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookChannelConfig {
    /// Channel name as referenced by `Campaign::channels`.
    pub name: String,
    /// Webhook endpoint receiving the outbound post.
    pub url: String,
    /// Optional bearer token.
    pub token: Option<String>,
    /// Per-request timeout override.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cadence/cadence.db", home)
}

fn default_tick_secs() -> u64 {
    DEFAULT_TICK_SECS
}

fn default_generator_base_url() -> String {
    "http://localhost:8787".to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_COLLABORATOR_TIMEOUT_MS
}

impl CadenceConfig {
    /// Load config from a TOML file with CADENCE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.cadence/cadence.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CadenceConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CADENCE_").split("_"))
            .extract()
            .map_err(|e| crate::error::CadenceError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cadence/cadence.toml", home)
}
