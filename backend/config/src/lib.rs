//! `pagesight-config`: runtime configuration.
//!
//! Provides:
//! - Typed config schema (speech, scan, enrichment, providers, TTS, browser, logging)
//! - YAML read/write with a single backup
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with errors and warnings
//! - Redaction for display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw, write_config, CONFIG_PATH_ENV};
pub use redact::{collect_redacted_paths, redact, redact_config};
pub use schema::{
    BrowserConfig, EnrichmentConfig, HuggingFaceConfig, LoggingConfig, PageSightConfig, PlayerConfig,
    ProvidersConfig, ScanConfig, SpeechConfig, TtsConfig, TtsKind, VisionConfig, VisionKind,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Load, substitute env vars, apply defaults, and validate a config file.
///
/// Warnings are logged; any validation error fails the load.
pub async fn load_and_prepare(path: &Path) -> Result<PageSightConfig> {
    let raw = load_raw(path).await?;
    let resolved = resolve_env_vars(&raw).context("Failed to resolve env vars in config")?;
    finish(resolved)
}

/// [`load_and_prepare`] over an in-memory document and explicit environment.
pub fn prepare_with(yaml: &str, env: &HashMap<String, String>) -> Result<PageSightConfig> {
    let raw: serde_yaml::Value = serde_yaml::from_str(yaml).context("Failed to parse config YAML")?;
    let raw = match raw {
        serde_yaml::Value::Null => serde_yaml::Value::Mapping(Default::default()),
        other => other,
    };
    let resolved = resolve_env_vars_with(&raw, env).context("Failed to resolve env vars in config")?;
    finish(resolved)
}

fn finish(resolved: serde_yaml::Value) -> Result<PageSightConfig> {
    let config: PageSightConfig =
        serde_yaml::from_value(resolved).context("Failed to deserialize config after substitution")?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "[Config] Warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "[Config] Error");
    }
    if let Some(first) = report.errors.into_iter().next() {
        bail!(first);
    }
    Ok(config)
}
