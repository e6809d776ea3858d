use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config failed: {0}")]
    Read(String),
    #[error("parse config failed: {0}")]
    Parse(String),
    #[error("schema load failed: {0}")]
    SchemaLoad(String),
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),
    #[error("unsupported config: {0}")]
    UnsupportedConfig(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub catalog: Catalog,
    #[serde(default)]
    pub tracker: Tracker,
    #[serde(default)]
    pub dialogue: Dialogue,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub csv_path: String,
    #[serde(default)]
    pub match_locality: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tracker {
    #[serde(default = "default_change_detection")]
    pub change_detection: String,
}

impl Default for Tracker {
    fn default() -> Self {
        Self {
            change_detection: default_change_detection(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialogue {
    #[serde(default = "default_auto_policy")]
    pub auto_policy: bool,
}

impl Default for Dialogue {
    fn default() -> Self {
        Self {
            auto_policy: default_auto_policy(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_change_detection() -> String {
    "multiset".to_string()
}

fn default_auto_policy() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

const SUPPORTED_CHANGE_DETECTION: &[&str] = &["multiset", "per_key"];
const SUPPORTED_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

pub fn load_and_validate(path: &str) -> Result<Config, ConfigError> {
    let config_text =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(format!("{path}: {e}")))?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&config_text).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let instance = serde_json::to_value(value).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_against_schema(&instance)?;

    let cfg: Config =
        serde_json::from_value(instance).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_runtime_support(&cfg)?;
    Ok(cfg)
}

const SCHEMA_RELATIVE_PATH: &str = "config/config.schema.json";

fn schema_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from(SCHEMA_RELATIVE_PATH),
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .join(SCHEMA_RELATIVE_PATH),
    ]
}

fn locate_schema(candidates: &[PathBuf]) -> Result<PathBuf, ConfigError> {
    candidates.iter().find(|p| p.exists()).cloned().ok_or_else(|| {
        let searched: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
        ConfigError::SchemaLoad(format!(
            "rentbot config schema not found; searched {}",
            searched.join(", ")
        ))
    })
}

fn validate_against_schema(instance: &serde_json::Value) -> Result<(), ConfigError> {
    let schema_path = locate_schema(&schema_candidates())?;

    let schema_text =
        std::fs::read_to_string(schema_path).map_err(|e| ConfigError::SchemaLoad(e.to_string()))?;
    let schema: serde_json::Value =
        serde_json::from_str(&schema_text).map_err(|e| ConfigError::SchemaLoad(e.to_string()))?;

    let validator =
        jsonschema::validator_for(&schema).map_err(|e| ConfigError::SchemaLoad(e.to_string()))?;
    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| e.to_string())
        .collect();
    if !errors.is_empty() {
        return Err(ConfigError::SchemaValidation(errors.join("; ")));
    }
    Ok(())
}

fn validate_runtime_support(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.catalog.csv_path.trim().is_empty() {
        return Err(ConfigError::UnsupportedConfig(
            "catalog.csv_path must not be empty".to_string(),
        ));
    }
    if !SUPPORTED_CHANGE_DETECTION.contains(&cfg.tracker.change_detection.as_str()) {
        return Err(ConfigError::UnsupportedConfig(format!(
            "tracker.change_detection={} is not implemented; supported: multiset, per_key",
            cfg.tracker.change_detection
        )));
    }
    if !SUPPORTED_LOG_LEVELS.contains(&cfg.logging.level.to_ascii_lowercase().as_str()) {
        return Err(ConfigError::UnsupportedConfig(format!(
            "logging.level={} is not supported; expected one of trace, debug, info, warn, error",
            cfg.logging.level
        )));
    }
    Ok(())
}
