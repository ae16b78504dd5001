//! Config file location and parsing.

use crate::schema::StaytimeConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the staytime config directory.
/// Priority: `STAYTIME_CONFIG_DIR` env > `~/.staytime/` > `./.staytime`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("STAYTIME_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".staytime"))
        .unwrap_or_else(|| PathBuf::from(".staytime"))
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the YAML file as a raw value tree, before env substitution.
///
/// Returns `Ok(None)` when the file does not exist.
pub async fn load_raw_config(path: &Path) -> Result<Option<Value>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist");
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // An empty file is a valid, empty config.
    if raw.trim().is_empty() {
        return Ok(Some(Value::Object(Default::default())));
    }

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(Some(value))
}

/// Parse a value tree into the typed schema.
pub fn parse_config(value: Value) -> Result<StaytimeConfig> {
    serde_json::from_value(value).context("Config does not match the expected schema")
}
