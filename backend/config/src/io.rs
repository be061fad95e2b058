//! Config file read/write.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::schema::CanvasPilotConfig;

const CONFIG_FILE_NAME: &str = "config.yaml";

/// `CANVASPILOT_CONFIG_DIR` if set, else `~/.canvaspilot/`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CANVASPILOT_CONFIG_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    match dirs::home_dir() {
        Some(home) => home.join(".canvaspilot"),
        None => PathBuf::from(".canvaspilot"),
    }
}

/// `config.yaml` inside the given directory.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Parse YAML into the raw (pre-substitution) JSON value tree.
pub fn parse_yaml(raw: &str) -> Result<serde_json::Value> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    let value: serde_json::Value =
        serde_yaml::from_str(raw).context("Failed to parse config YAML")?;
    Ok(value)
}

/// Read the raw value tree. A missing file yields an empty object (first run).
pub async fn load_raw(path: &Path) -> Result<serde_json::Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(serde_json::Value::Object(Default::default()));
    }
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let value = parse_yaml(&raw).with_context(|| format!("In {}", path.display()))?;
    info!(path = %path.display(), "Loaded config");
    Ok(value)
}

/// Write atomically (temp file, then rename), keeping one `.bak` of the
/// previous file.
pub async fn write_config(config: &CanvasPilotConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    if path.exists() {
        let backup = path.with_extension("yaml.bak");
        if let Err(e) = fs::copy(path, &backup).await {
            warn!(backup = %backup.display(), error = %e, "Failed to back up config");
        }
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ProviderConfig;

    #[tokio::test]
    async fn missing_file_is_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let value = load_raw(&dir.path().join("absent.yaml")).await.unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn write_then_read_back_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        let mut config = CanvasPilotConfig::default();
        config.provider = Some(ProviderConfig {
            kind: Some("ollama".to_string()),
            ..Default::default()
        });

        write_config(&config, &path).await.unwrap();
        write_config(&config, &path).await.unwrap();

        let value = load_raw(&path).await.unwrap();
        assert_eq!(value["provider"]["kind"], "ollama");
        assert!(path.with_extension("yaml.bak").exists());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(parse_yaml("provider: [unclosed").is_err());
    }
}
