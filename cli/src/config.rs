use anyhow::{bail, Context, Result};
use batchchat_core::config::{get_default_config_file, ChatConfig, APP_NAME};

use std::path::PathBuf;

use crate::cli::Args;

/// Layers the config file, then the environment, then command-line flags.
pub fn resolve(args: &Args) -> Result<ChatConfig> {
    let file_config = match &args.config {
        Some(path) => {
            if !path.exists() {
                bail!("Config file {} does not exist", path.display());
            }
            ChatConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => match get_default_config_file(APP_NAME) {
            Ok(path) => ChatConfig::load_from_file(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            Err(_) => ChatConfig::default(),
        },
    };

    let env_config = ChatConfig::from_env().context("Invalid environment configuration")?;

    Ok(file_config.merge(&env_config).merge(&from_args(args)))
}

/// Writes `config` to the `--config` path, or the default config file.
pub fn save(args: &Args, config: &ChatConfig) -> Result<PathBuf> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file(APP_NAME).context("No default config location")?,
    };
    config
        .save_to_file(&path)
        .with_context(|| format!("Failed to save config to {}", path.display()))?;
    Ok(path)
}

fn from_args(args: &Args) -> ChatConfig {
    ChatConfig {
        endpoint: args.endpoint.clone(),
        request_timeout_secs: args.timeout,
        ..ChatConfig::default()
    }
}
