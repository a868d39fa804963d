use crate::errors::{ChatError, ChatResult};
use crate::types::GenerationConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "batchchat";
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/chat";

/// Configuration for the batch chat client
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ChatConfig {
    pub endpoint: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub log_level: Option<String>,
}

impl ChatConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> ChatResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                ChatError::ConfigError(format!("Failed to read config file: {}", e))
            })?;

            let config: Self = toml::from_str(&content).map_err(|e| {
                ChatError::ConfigError(format!("Failed to parse config file: {}", e))
            })?;

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> ChatResult<()> {
        let content = toml::to_string(self).map_err(|e| {
            ChatError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ChatError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            ChatError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            endpoint: other.endpoint.clone().or_else(|| self.endpoint.clone()),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            temperature: other.temperature.or(self.temperature),
            max_tokens: other.max_tokens.or(self.max_tokens),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
        }
    }

    /// Reads `BATCHCHAT_ENDPOINT` and `BATCHCHAT_TIMEOUT_SECS`.
    pub fn from_env() -> ChatResult<Self> {
        let request_timeout_secs = match env::var("BATCHCHAT_TIMEOUT_SECS") {
            Ok(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                ChatError::ConfigError(format!("Invalid BATCHCHAT_TIMEOUT_SECS '{}': {}", raw, e))
            })?),
            Err(_) => None,
        };

        Ok(Self {
            endpoint: env::var("BATCHCHAT_ENDPOINT").ok(),
            request_timeout_secs,
            ..Self::default()
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Per-slot request deadline; zero disables it
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> ChatResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        ChatError::ConfigError("Could not determine home directory".to_string())
    })?;

    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> ChatResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
