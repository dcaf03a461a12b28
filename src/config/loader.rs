// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CalcdagError, Result};

/// Environment variables that override individual settings, applied after
/// the file is read and before validation. Times are integer milliseconds.
pub const ENV_COMPUTING_POWER: &str = "COMPUTING_POWER";
pub const ENV_TIME_ADDITION_MS: &str = "TIME_ADDITION_MS";
pub const ENV_TIME_SUBTRACTION_MS: &str = "TIME_SUBTRACTION_MS";
pub const ENV_TIME_MULTIPLICATIONS_MS: &str = "TIME_MULTIPLICATIONS_MS";
pub const ENV_TIME_DIVISIONS_MS: &str = "TIME_DIVISIONS_MS";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load, apply environment overrides from the process environment, and
/// validate.
///
/// `path = None` means "use [`default_config_path`] if it exists, otherwise
/// built-in defaults". An explicit path that does not exist is an error.
pub fn load_and_validate(path: Option<&Path>) -> Result<ConfigFile> {
    load_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load_and_validate`], but environment variables are read through
/// `lookup`.
pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<ConfigFile>
where
    F: Fn(&str) -> Option<String>,
{
    let mut raw = match path {
        Some(path) => load_from_path(path)?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                load_from_path(&default_path)?
            } else {
                debug!(path = %default_path.display(), "no config file found, using defaults");
                RawConfigFile::default()
            }
        }
    };

    apply_env_overrides(&mut raw, lookup)?;
    ConfigFile::try_from(raw)
}

/// Overlay the supported environment variables onto `raw`.
pub fn apply_env_overrides<F>(raw: &mut RawConfigFile, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_COMPUTING_POWER) {
        raw.agent.computing_power = value.trim().parse().map_err(|e| {
            CalcdagError::ConfigError(format!("{ENV_COMPUTING_POWER}='{value}': {e}"))
        })?;
    }

    let times = [
        (ENV_TIME_ADDITION_MS, &mut raw.operations.addition),
        (ENV_TIME_SUBTRACTION_MS, &mut raw.operations.subtraction),
        (ENV_TIME_MULTIPLICATIONS_MS, &mut raw.operations.multiplication),
        (ENV_TIME_DIVISIONS_MS, &mut raw.operations.division),
    ];
    for (key, slot) in times {
        if let Some(value) = lookup(key) {
            let millis: u64 = value
                .trim()
                .parse()
                .map_err(|e| CalcdagError::ConfigError(format!("{key}='{value}': {e}")))?;
            *slot = format!("{millis}ms");
        }
    }

    Ok(())
}

/// Default config location: `Calcdag.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Calcdag.toml")
}
