//! Store configuration.
//!
//! Loaded from `imagebarn.toml` in a config directory. User values are merged
//! on top of stock defaults, so the file only needs the keys it changes.
//! Unknown keys are rejected to catch typos early.
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! images_root = "images"                    # One directory per approved user
//! approved_users_file = "approved-users.json"
//! admin_email = ""                          # Always approved; empty = none
//!
//! [transcode]
//! workers = 1                               # Concurrent transcodes (>= 1)
//!
//! [ghosting]
//! strategy = "copy"                         # "copy" or "rename"
//! ```
//!
//! ## Environment
//!
//! `IMAGE_WORKERS` overrides `transcode.workers`. It is read once at startup;
//! a value that is not a positive integer is a configuration error and the
//! process must not start.

use crate::ghost::GhostStrategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file inside the config directory.
pub const CONFIG_FILENAME: &str = "imagebarn.toml";

/// Environment variable overriding the transcode pool width.
pub const WORKERS_ENV: &str = "IMAGE_WORKERS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BarnConfig {
    /// Root directory holding one encoded directory per user.
    pub images_root: PathBuf,
    /// JSON file persisting the approval registry.
    pub approved_users_file: PathBuf,
    /// Email that is always approved. Empty for none.
    pub admin_email: String,
    pub transcode: TranscodeConfig,
    pub ghosting: GhostingConfig,
}

impl Default for BarnConfig {
    fn default() -> Self {
        Self {
            images_root: PathBuf::from("images"),
            approved_users_file: PathBuf::from("approved-users.json"),
            admin_email: String::new(),
            transcode: TranscodeConfig::default(),
            ghosting: GhostingConfig::default(),
        }
    }
}

/// Transcode pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranscodeConfig {
    /// Maximum number of transcodes running at once.
    pub workers: i64,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

/// How drawn images are consumed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GhostingConfig {
    pub strategy: GhostStrategy,
}

impl BarnConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transcode.workers < 1 {
            return Err(ConfigError::Validation(format!(
                "transcode.workers must be at least 1, got {}",
                self.transcode.workers
            )));
        }
        Ok(())
    }

    /// Pool width. Only meaningful after [`validate`](Self::validate).
    pub fn workers(&self) -> usize {
        usize::try_from(self.transcode.workers).unwrap_or(1).max(1)
    }

    /// The admin email, if one is configured.
    pub fn admin(&self) -> Option<&str> {
        Some(self.admin_email.trim()).filter(|email| !email.is_empty())
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(WORKERS_ENV) {
            let workers: i64 = raw.trim().parse().map_err(|e| {
                ConfigError::Validation(format!(
                    "{WORKERS_ENV}={raw:?} must be an integer: {e}"
                ))
            })?;
            if workers < 1 {
                return Err(ConfigError::Validation(format!(
                    "{WORKERS_ENV} needs at least one worker, got {workers}"
                )));
            }
            self.transcode.workers = workers;
        }
        Ok(())
    }

    /// Resolve a configured path against the config directory.
    pub fn resolve(&self, config_dir: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            config_dir.join(path)
        }
    }
}

pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(BarnConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `imagebarn.toml` from `dir` as a raw TOML value, or `None` if absent.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `dir` without environment overrides.
pub fn load_config(dir: &Path) -> Result<BarnConfig, ConfigError> {
    let merged = match load_raw_config(dir)? {
        Some(overlay) => merge_toml(stock_defaults_value()?, overlay),
        None => stock_defaults_value()?,
    };
    let config: BarnConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `dir` and apply process environment overrides.
///
/// This is the startup path: any error here is fatal.
pub fn load_startup_config(dir: &Path) -> Result<BarnConfig, ConfigError> {
    let mut config = load_config(dir)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `imagebarn.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# image-barn configuration
# ========================
# Every key is optional; the values below are the defaults.

# Directory holding one encoded subdirectory per approved user.
images_root = "images"

# JSON object of {"email": approved} persisted by approve/disapprove.
approved_users_file = "approved-users.json"

# Always approved, even if the registry says otherwise. Empty for none.
admin_email = ""

[transcode]
# Maximum number of uploads transcoded at the same time.
# Overridden by the IMAGE_WORKERS environment variable.
workers = 1

[ghosting]
# How a drawn image is consumed:
#   "copy"   - copy to the .ghost name, fsync, delete the original
#   "rename" - atomic rename to the .ghost name
strategy = "copy"
"##
}
