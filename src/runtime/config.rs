//! Loading the host configuration
//!
//! Defaults first, then the JSON file named by `LUAWK_CONFIG`, then the
//! individual `LUAWK_*` overrides.

use anyhow::{Context, Result as AnyResult};
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::Path;

use super::HostConfig;
use super::error::{HostError, Result};

/// Path of a JSON config file
pub const CONFIG_ENV: &str = "LUAWK_CONFIG";
/// Entry module override
pub const MODULE_ENV: &str = "LUAWK_MODULE";
/// Module search directories, in the platform's path-list syntax
pub const PATH_ENV: &str = "LUAWK_PATH";
/// Checkpoint interval override
pub const CHECKPOINT_ENV: &str = "LUAWK_CHECKPOINT";
/// Log filter override
pub const LOG_ENV: &str = "LUAWK_LOG";

impl HostConfig {
    /// Configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var_os(key))
    }

    /// Configuration from an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut config = match var(CONFIG_ENV) {
            Some(path) => load_config(Path::new(&path))
                .map_err(|err| HostError::Config(format!("{err:#}")))?,
            None => HostConfig::default(),
        };

        if let Some(module) = var(MODULE_ENV) {
            config.entry_module = utf8_var(MODULE_ENV, module)?;
        }

        if let Some(paths) = var(PATH_ENV) {
            config.module_paths = env::split_paths(&paths)
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
        }

        if let Some(interval) = var(CHECKPOINT_ENV) {
            let interval = utf8_var(CHECKPOINT_ENV, interval)?;
            config.checkpoint_interval = interval.trim().parse().map_err(|_| {
                HostError::Config(format!(
                    "{CHECKPOINT_ENV} must be a positive integer, got '{interval}'"
                ))
            })?;
        }

        if let Some(filter) = var(LOG_ENV) {
            config.log_filter = utf8_var(LOG_ENV, filter)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn utf8_var(key: &str, value: OsString) -> Result<String> {
    value
        .into_string()
        .map_err(|_| HostError::Config(format!("{key} is not valid UTF-8")))
}

/// Load host configuration from a JSON file
pub fn load_config(path: &Path) -> AnyResult<HostConfig> {
    let data = fs::read(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let config: HostConfig = serde_json::from_slice(&data)
        .with_context(|| format!("Failed to deserialize config: {:?}", path))?;

    Ok(config)
}
