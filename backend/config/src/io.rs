//! Config file location, reading, and atomic writing.

use crate::schema::PageSightConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Overrides the config file path entirely.
pub const CONFIG_PATH_ENV: &str = "PAGESIGHT_CONFIG";

/// `~/.pagesight`, or `.pagesight` when there is no home directory.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".pagesight"))
        .unwrap_or_else(|| PathBuf::from(".pagesight"))
}

/// Priority: `PAGESIGHT_CONFIG` > `~/.pagesight/config.yaml`.
pub fn config_file_path() -> PathBuf {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => config_dir().join(CONFIG_FILE_NAME),
    }
}

/// Read the raw YAML tree. A missing file is an empty mapping (first run).
pub async fn load_raw(path: &Path) -> Result<serde_yaml::Value> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "[Config] File does not exist; using defaults");
        return Ok(serde_yaml::Value::Mapping(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // An empty file parses as null; treat it like a missing one.
    let value: serde_yaml::Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;
    info!(path = %path.display(), "[Config] Loaded");
    Ok(match value {
        serde_yaml::Value::Null => serde_yaml::Value::Mapping(Default::default()),
        other => other,
    })
}

/// Write via a temp file and rename. The previous file is kept as `.bak`.
pub async fn write_config(config: &PageSightConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    if fs::try_exists(path).await.unwrap_or(false) {
        let bak = path.with_extension("yaml.bak");
        if let Err(e) = fs::copy(path, &bak).await {
            warn!("[Config] Failed to create backup {}: {}", bak.display(), e);
        }
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "[Config] Wrote");
    Ok(())
}
