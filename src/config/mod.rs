mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./nalcast.toml", "~/.config/nalcast/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.demux.demux.trim().is_empty() {
        anyhow::bail!("Demuxer name cannot be empty");
    }

    if !(config.demux.fps.is_finite() && config.demux.fps > 0.0) {
        anyhow::bail!("Frame rate must be positive, got {}", config.demux.fps);
    }

    if config.queue.capacity == 0 {
        anyhow::bail!("Queue capacity cannot be 0");
    }

    if config.source.poll_timeout_ms == 0 {
        anyhow::bail!("Poll timeout cannot be 0");
    }

    if config.source.max_item_len == 0 {
        anyhow::bail!("Maximum item length cannot be 0");
    }

    if let Some(ref library) = config.vlc.library {
        if !library.exists() {
            tracing::warn!("Configured libvlc path does not exist: {:?}", library);
        }
    }

    Ok(())
}
