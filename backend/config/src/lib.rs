//! `canvaspilot-config`: runtime configuration.
//!
//! Provides:
//! - Typed config schema (provider, dispatch, supervisor, store, logging)
//! - YAML read/write
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with field paths
//! - Redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw, parse_yaml, write_config};
pub use redact::redact;
pub use schema::{
    CanvasPilotConfig, DispatchConfig, LoggingConfig, ProviderConfig, StoreConfig,
    SupervisorConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Load a config file, substitute env vars, apply defaults and validate.
///
/// Validation problems are logged and returned; the caller decides whether
/// errors are fatal.
pub async fn load_and_prepare(path: &Path) -> Result<(CanvasPilotConfig, ValidationReport)> {
    let raw = load_raw(path).await?;
    prepare(&raw, &std::env::vars().collect())
}

/// The pipeline behind `load_and_prepare`, from an already-parsed value.
pub fn prepare(
    raw: &Value,
    env: &HashMap<String, String>,
) -> Result<(CanvasPilotConfig, ValidationReport)> {
    let value = resolve_env_vars_with(raw, env).context("Failed to resolve env vars in config")?;
    let config: CanvasPilotConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    Ok((config, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
provider:
  kind: openai
  apiKey: ${OPENAI_API_KEY}
dispatch:
  temperature: 0.5
store:
  backend: sqlite
  path: /tmp/canvas.db
"#;

    #[test]
    fn prepare_substitutes_and_defaults() {
        let raw = parse_yaml(YAML).unwrap();
        let env = HashMap::from([("OPENAI_API_KEY".to_string(), "sk-live".to_string())]);
        let (config, report) = prepare(&raw, &env).unwrap();

        assert!(report.is_valid(), "errors: {:?}", report.errors);
        let provider = config.provider.unwrap();
        assert_eq!(provider.api_key.as_deref(), Some("sk-live"));
        assert_eq!(provider.model.as_deref(), Some("gpt-4o-mini"));
        let dispatch = config.dispatch.unwrap();
        assert_eq!(dispatch.temperature, Some(0.5));
        assert_eq!(dispatch.max_tokens, Some(defaults::DEFAULT_MAX_TOKENS));
    }

    #[test]
    fn prepare_fails_on_missing_env() {
        let raw = parse_yaml(YAML).unwrap();
        let err = prepare(&raw, &HashMap::new()).unwrap_err();
        assert!(format!("{err:#}").contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn load_and_prepare_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        tokio::fs::write(&path, "provider:\n  kind: mock\n").await.unwrap();

        let (config, report) = load_and_prepare(&path).await.unwrap();
        assert!(report.is_valid());
        assert_eq!(config.provider.unwrap().kind.as_deref(), Some("mock"));
    }
}
