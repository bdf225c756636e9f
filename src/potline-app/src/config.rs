// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),

    #[error("Invalid value for environment variable {0}: {1}")]
    EnvError(String, String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Returns the default search paths for `potline.toml`
/// (current directory → XDG config → /etc).
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("potline.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("potline").join("potline.toml"));
    }
    paths.push(PathBuf::from("/etc/potline/potline.toml"));
    paths
}

/// Extract and deserialize a named section from a TOML file.
///
/// Returns `Ok(Some(cfg))` when the section is present and parses cleanly,
/// `Ok(None)` when the section is absent, or `Err` on I/O / parse failure.
fn load_section_from_file<T: DeserializeOwned>(
    path: &Path,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

    let table: toml::Table = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

    let Some(section) = table.get(key) else {
        return Ok(None);
    };

    // Re-serialize the section then parse as T so all serde defaults apply.
    let section_toml = toml::to_string(section)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
    let cfg = toml::from_str::<T>(&section_toml)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
    Ok(Some(cfg))
}

/// Parse an environment override, naming the variable on failure.
pub fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::EnvError(name.to_string(), format!("'{raw}': {e}")))
}

/// Trait for loading configuration from a `potline.toml` section.
///
/// Values are layered: built-in defaults, then the config file, then
/// environment variables. Environment variables win.
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    /// Section key in `potline.toml` (e.g. `"potline"`).
    fn section_key() -> &'static str;

    /// Apply overrides from `lookup`, which maps a variable name to its
    /// value. The default implementation has no overrides.
    fn apply_env_overrides<F>(&mut self, _lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(())
    }

    /// Check cross-field invariants after all layers were applied.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Load the section from a specific file path.
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// does not contain the expected `[<section_key>]` header.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        load_section_from_file::<Self>(path, Self::section_key())?.ok_or_else(|| {
            ConfigError::ParseError(
                path.to_path_buf(),
                format!("missing [{}] section", Self::section_key()),
            )
        })
    }

    /// Search default paths (`potline.toml` in CWD → XDG → /etc) and load
    /// the first file that contains the expected section.
    ///
    /// Returns `(config, path_where_found)` or `(Default::default(), None)`
    /// when no config file is found.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in config_search_paths() {
            if path.exists() {
                if let Some(cfg) = load_section_from_file::<Self>(&path, Self::section_key())? {
                    return Ok((cfg, Some(path)));
                }
            }
        }
        Ok((Self::default(), None))
    }

    /// Defaults, then `path` (or the default search paths), then the process
    /// environment, then validation.
    fn load_layered(path: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let (mut cfg, source) = match path {
            Some(path) => (Self::load_from_file(path)?, Some(path.to_path_buf())),
            None => Self::load_from_default_paths()?,
        };
        cfg.apply_env_overrides(|name| std::env::var(name).ok())?;
        cfg.validate()?;
        Ok((cfg, source))
    }
}
