//! Kirppu configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat platform configuration
    pub platform: PlatformConfig,

    /// Marketplace ad service configuration
    pub market: MarketConfig,

    /// Advisory (vision/LLM) configuration
    pub advisory: AdvisoryConfig,

    /// Session actor tuning
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration with fallback chain: explicit path, then
    /// `.kirppu.yml`, then `~/.config/kirppu/kirppu.yml`, then defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".kirppu.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("kirppu").join("kirppu.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Validate configuration before wiring real collaborators
    ///
    /// Checks that the required API-key environment variables are set so a
    /// misconfigured deployment fails fast with a clear message. A dry run
    /// skips this entirely.
    pub fn validate(&self) -> Result<()> {
        for (what, var) in [
            ("chat platform", &self.platform.token_env),
            ("ad service", &self.market.api_key_env),
            ("advisory service", &self.advisory.api_key_env),
        ] {
            if std::env::var(var).is_err() {
                return Err(eyre::eyre!(
                    "{} credentials not found. Set the {} environment variable.",
                    what,
                    var
                ));
            }
        }
        Ok(())
    }
}

/// Chat platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Environment variable containing the bot token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Long-poll timeout in seconds
    #[serde(rename = "poll-timeout-s")]
    pub poll_timeout_s: u64,

    /// User ids allowed to talk to the bot; empty means open to everyone
    #[serde(rename = "allowed-users")]
    pub allowed_users: Vec<i64>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            token_env: "KIRPPU_BOT_TOKEN".to_string(),
            base_url: "https://api.telegram.org".to_string(),
            poll_timeout_s: 30,
            allowed_users: Vec::new(),
        }
    }
}

/// Marketplace ad service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.marketplace.example".to_string(),
            api_key_env: "KIRPPU_MARKET_KEY".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Advisory (vision/LLM) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL (OpenAI-compatible)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Attribute names the advisor must never resolve automatically;
    /// inherently subjective fields stay with the user
    #[serde(rename = "manual-attributes")]
    pub manual_attributes: Vec<String>,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 1024,
            timeout_ms: 60_000,
            manual_attributes: vec!["condition".to_string()],
        }
    }
}

/// Session actor tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Album aggregation window in milliseconds: photos arriving within
    /// this window of the first one are treated as one batch
    #[serde(rename = "album-window-ms")]
    pub album_window_ms: u64,

    /// Delay before a "still working" notice during a long remote flow
    #[serde(rename = "status-tick-ms")]
    pub status_tick_ms: u64,

    /// Mailbox capacity per session actor
    #[serde(rename = "mailbox-capacity")]
    pub mailbox_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            album_window_ms: 1500,
            status_tick_ms: 4000,
            mailbox_capacity: 64,
        }
    }
}
