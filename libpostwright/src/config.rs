//! Configuration management for Postwright

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The single operator identity allowed to drive the bot.
    pub authorized_user_id: u64,

    /// System prompt handed to the generative collaborator.
    #[serde(default = "default_persona")]
    pub persona_prompt: String,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory where incoming attachments are staged until published.
    pub dir: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().to_string_lossy().into_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Offset applied when rendering publish times to the operator.
    /// Scheduling itself is always absolute UTC.
    pub utc_offset_hours: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { utc_offset_hours: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Quick-delay choices (minutes) the transport renders next to
    /// "publish now".
    pub quick_delays_minutes: Vec<u64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            quick_delays_minutes: vec![15, 30, 60],
        }
    }
}

fn default_persona() -> String {
    "You are my personal news commentator writing short posts. Rewrite the \
     source text as one or two sharp, emotional sentences in the voice of an \
     ordinary, engaged citizen: direct, a little ironic when it fits, under \
     280 characters, with fitting hashtags. No officialese, no clichés."
        .to_string()
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration for the given operator
    pub fn default_config(authorized_user_id: u64) -> Self {
        Self {
            authorized_user_id,
            persona_prompt: default_persona(),
            media: MediaConfig::default(),
            display: DisplayConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }

    pub fn authorized_user(&self) -> UserId {
        UserId(self.authorized_user_id)
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("POSTWRIGHT_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("postwright").join("config.toml"))
}
