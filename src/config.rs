//! Configuration file support for nvd-feed-sync.
//!
//! Provides YAML-based configuration through `nvd-feed-sync.config.yml`
//! files, including data structures, file loading, and validation.

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_yaml_ng::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::shared::logging::LogFormat;
use crate::shared::Result;

pub const CONFIG_FILENAME: &str = "nvd-feed-sync.config.yml";

/// Top-level configuration file schema.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub database: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    /// Default job parameters (`YEARS`, `CLEAR`, `BACKGROUND`, `SILENT`).
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    /// Captures unknown fields for warnings.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, Value>,
}

impl ConfigFile {
    /// Job parameters rendered as strings, the form jobs receive them in.
    ///
    /// YAML scalars are accepted as-is: `CLEAR: true`, `YEARS: 2015` and
    /// `YEARS: "2015 2016"` all work.
    pub fn parameter_values(&self) -> Vec<(String, String)> {
        self.parameters
            .iter()
            .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key.clone(), v)))
            .collect()
    }
}

/// Load config from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read config file: {}\n\n💡 Hint: Check that the file exists and is readable.",
            path.display()
        )
    })?;

    let config: ConfigFile = serde_yaml_ng::from_str(&content).with_context(|| {
        format!(
            "Failed to parse config file: {}\n\n💡 Hint: Ensure the file contains valid YAML syntax.",
            path.display()
        )
    })?;

    validate_config(&config)?;
    warn_unknown_fields(&config);

    Ok(config)
}

/// Auto-discover config in a directory. Returns `None` silently if not found.
pub fn discover_config(dir: &Path) -> Result<Option<ConfigFile>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let config = load_config_from_path(&config_path)?;
    Ok(Some(config))
}

/// Validate the loaded configuration.
fn validate_config(config: &ConfigFile) -> Result<()> {
    if let Some(ref base_url) = config.base_url {
        if base_url.trim().is_empty() {
            bail!(
                "Invalid config: base_url must not be empty.\n\n\
                 💡 Hint: Remove the field to use the default NVD download location."
            );
        }
    }

    for (key, value) in &config.parameters {
        if scalar_to_string(value).is_none() {
            bail!(
                "Invalid config: parameters.{} must be a string, number or boolean.\n\n\
                 💡 Hint: Write year lists as a single string, e.g. YEARS: \"2015 2016\".",
                key
            );
        }
    }
    Ok(())
}

/// Warn about unknown fields in the config file.
fn warn_unknown_fields(config: &ConfigFile) {
    for key in config.unknown_fields.keys() {
        eprintln!(
            "⚠️  Warning: Unknown config field '{}' will be ignored.",
            key
        );
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "yes" } else { "no" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}
