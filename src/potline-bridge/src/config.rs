// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration for the potting-line bridge.
//!
//! Read from the `[potline]` section of `potline.toml`, then overridden by
//! `POTLINE_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use potline_app::{parse_env, ConfigError, ConfigFile};
use potline_core::controller::RetryConfig;
use potline_protocol::parse_endpoint;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Line gateway connection
    pub connection: ConnectionConfig,
    /// Retry behaviour for every remote call
    pub retry: RetryConfig,
    /// Completion log file
    pub completion_log: CompletionLogConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
        }
    }
}

/// Connection to the line gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Endpoint URL, e.g. `opc.tcp://plc-lijn:4840`
    pub endpoint: String,
    /// Upper bound for establishing a session in milliseconds
    pub connect_timeout_ms: u64,
    /// Upper bound for a single request on an open session in milliseconds
    pub request_timeout_ms: u64,
    /// Keep-alive interval advertised to the gateway in milliseconds
    pub watchdog_interval_ms: u64,
    /// Namespace URI under which the line values are published
    pub namespace_uri: String,
    /// Transport security and identity
    pub security: SecurityConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: "opc.tcp://localhost:4840".to_string(),
            connect_timeout_ms: 5000,
            request_timeout_ms: 5000,
            watchdog_interval_ms: 10_000,
            namespace_uri: "urn:potline:lines".to_string(),
            security: SecurityConfig::default(),
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        parse_endpoint(&self.endpoint).map_err(|e| format!("[connection].endpoint: {e}"))?;
        if self.connect_timeout_ms == 0 {
            return Err("[connection].connect_timeout_ms must be greater than 0".into());
        }
        if self.request_timeout_ms == 0 {
            return Err("[connection].request_timeout_ms must be greater than 0".into());
        }
        if self.namespace_uri.trim().is_empty() {
            return Err("[connection].namespace_uri must not be empty".into());
        }
        self.security.validate()
    }
}

/// Security policy URI suffix negotiated with the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityPolicy {
    #[default]
    None,
    Basic256Sha256,
}

impl SecurityPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Basic256Sha256 => "Basic256Sha256",
        }
    }
}

/// Message security mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityMode {
    #[default]
    None,
    Sign,
    SignAndEncrypt,
}

impl SecurityMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Sign => "Sign",
            Self::SignAndEncrypt => "SignAndEncrypt",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub policy: SecurityPolicy,
    pub mode: SecurityMode,
    /// Client certificate (DER or PEM), required unless `mode` is `None`
    pub certificate: Option<PathBuf>,
    /// Private key for `certificate`
    pub private_key: Option<PathBuf>,
    /// User name for the identity token; anonymous when unset
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SecurityConfig {
    pub fn validate(&self) -> Result<(), String> {
        match (self.policy, self.mode) {
            (SecurityPolicy::None, SecurityMode::None) => {}
            (SecurityPolicy::None, mode) => {
                return Err(format!(
                    "[connection.security].mode = \"{}\" requires a policy other than None",
                    mode.as_str()
                ));
            }
            (_, SecurityMode::None) => {
                return Err("[connection.security].policy requires mode Sign or SignAndEncrypt".into());
            }
            _ => {}
        }

        if self.mode != SecurityMode::None {
            for (name, path) in [
                ("certificate", &self.certificate),
                ("private_key", &self.private_key),
            ] {
                let Some(path) = path else {
                    return Err(format!(
                        "[connection.security].{name} is required when mode is {}",
                        self.mode.as_str()
                    ));
                };
                if !path.exists() {
                    return Err(format!(
                        "[connection.security].{name} '{}' does not exist",
                        path.display()
                    ));
                }
            }
        }

        if self.password.is_some() && self.username.is_none() {
            return Err("[connection.security].password is set without a username".into());
        }
        Ok(())
    }
}

fn default_completion_log_dir() -> String {
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir
            .join("potline")
            .join("completions")
            .to_string_lossy()
            .to_string();
    }
    "logs/completions".to_string()
}

/// JSON-lines log of completed lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionLogConfig {
    /// Whether completion events are written to a file
    pub enabled: bool,
    /// Base directory for log files
    pub dir: String,
    /// Log filename; `%YYYY%`, `%MM%` and `%DD%` are replaced with the UTC date
    pub file: String,
}

impl Default for CompletionLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_completion_log_dir(),
            file: "completions-%YYYY%-%MM%-%DD%.log".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Render as a `[potline]` TOML document with the password masked.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        let mut redacted = self.clone();
        if redacted.connection.security.password.is_some() {
            redacted.connection.security.password = Some("********".to_string());
        }
        let mut root = toml::Table::new();
        root.insert(
            Self::section_key().to_string(),
            toml::Value::try_from(&redacted)?,
        );
        toml::to_string_pretty(&root)
    }
}

impl ConfigFile for BridgeConfig {
    fn section_key() -> &'static str {
        "potline"
    }

    fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let conn = &mut self.connection;
        if let Some(v) = lookup("POTLINE_ENDPOINT") {
            conn.endpoint = v;
        }
        if let Some(v) = lookup("POTLINE_CONNECT_TIMEOUT_MS") {
            conn.connect_timeout_ms = parse_env("POTLINE_CONNECT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("POTLINE_REQUEST_TIMEOUT_MS") {
            conn.request_timeout_ms = parse_env("POTLINE_REQUEST_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("POTLINE_WATCHDOG_INTERVAL_MS") {
            conn.watchdog_interval_ms = parse_env("POTLINE_WATCHDOG_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("POTLINE_NAMESPACE_URI") {
            conn.namespace_uri = v;
        }
        if let Some(v) = lookup("POTLINE_USERNAME") {
            conn.security.username = Some(v);
        }
        if let Some(v) = lookup("POTLINE_PASSWORD") {
            conn.security.password = Some(v);
        }

        if let Some(v) = lookup("POTLINE_RETRY_ATTEMPTS") {
            self.retry.attempts = parse_env("POTLINE_RETRY_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("POTLINE_RETRY_DELAY_MS") {
            self.retry.delay_ms = parse_env("POTLINE_RETRY_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("POTLINE_RETRY_MAX_DELAY_MS") {
            self.retry.max_delay_ms = parse_env("POTLINE_RETRY_MAX_DELAY_MS", &v)?;
        }

        if let Some(v) = lookup("POTLINE_LOG_LEVEL") {
            self.general.log_level = Some(v);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate().map_err(ConfigError::Invalid)?;
        self.connection.validate().map_err(ConfigError::Invalid)?;
        if self.completion_log.enabled && self.completion_log.dir.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "[completion_log].dir must not be empty when enabled".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(toml_str: &str) -> BridgeConfig {
        let table: toml::Table = toml::from_str(toml_str).unwrap();
        let section = toml::to_string(&table["potline"]).unwrap();
        toml::from_str(&section).unwrap()
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.connection.endpoint, "opc.tcp://localhost:4840");
        assert_eq!(config.connection.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.connection.watchdog_interval(), Duration::from_secs(10));
        assert_eq!(config.connection.namespace_uri, "urn:potline:lines");
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.retry.delay_ms, 1000);
        assert_eq!(config.general.log_level.as_deref(), Some("info"));
        assert!(!config.completion_log.enabled);
        assert!(ConfigFile::validate(&config).is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = parse(
            r#"
[potline.connection]
endpoint = "opc.tcp://192.168.10.20:4840"
namespace_uri = "urn:kwekerij:potting"

[potline.retry]
attempts = 5
"#,
        );
        assert_eq!(config.connection.endpoint, "opc.tcp://192.168.10.20:4840");
        assert_eq!(config.connection.namespace_uri, "urn:kwekerij:potting");
        assert_eq!(config.connection.request_timeout_ms, 5000);
        assert_eq!(config.retry.attempts, 5);
        assert_eq!(config.retry.delay_ms, 1000);
    }

    #[test]
    fn test_env_wins_over_file() {
        let mut config = parse(
            r#"
[potline.connection]
endpoint = "opc.tcp://from-file:4840"

[potline.retry]
attempts = 5
"#,
        );
        config
            .apply_env_overrides(env(&[
                ("POTLINE_ENDPOINT", "opc.tcp://from-env:4841"),
                ("POTLINE_RETRY_ATTEMPTS", "2"),
                ("POTLINE_RETRY_DELAY_MS", "10"),
                ("POTLINE_USERNAME", "operator"),
                ("POTLINE_PASSWORD", "secret"),
            ]))
            .unwrap();
        assert_eq!(config.connection.endpoint, "opc.tcp://from-env:4841");
        assert_eq!(config.retry.attempts, 2);
        assert_eq!(config.retry.delay_ms, 10);
        assert_eq!(config.connection.security.username.as_deref(), Some("operator"));
        assert!(ConfigFile::validate(&config).is_ok());
    }

    #[test]
    fn test_bad_env_number() {
        let mut config = BridgeConfig::default();
        let err = config
            .apply_env_overrides(env(&[("POTLINE_CONNECT_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("POTLINE_CONNECT_TIMEOUT_MS"));
    }

    #[test]
    fn test_rejects_zero_attempts_and_delay() {
        let mut config = BridgeConfig::default();
        config.retry.attempts = 0;
        assert!(matches!(
            ConfigFile::validate(&config),
            Err(ConfigError::Invalid(_))
        ));

        let mut config = BridgeConfig::default();
        config.retry.delay_ms = 0;
        assert!(ConfigFile::validate(&config).is_err());
    }

    #[test]
    fn test_rejects_max_delay_below_delay() {
        let mut config = BridgeConfig::default();
        config
            .apply_env_overrides(env(&[("POTLINE_RETRY_MAX_DELAY_MS", "0")]))
            .unwrap();
        let err = ConfigFile::validate(&config).unwrap_err();
        assert!(err.to_string().contains("max_delay_ms"));
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        let mut config = BridgeConfig::default();
        config.connection.endpoint = "http://plc:80".to_string();
        let err = ConfigFile::validate(&config).unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn test_security_requires_certificate() {
        let mut security = SecurityConfig {
            policy: SecurityPolicy::Basic256Sha256,
            mode: SecurityMode::SignAndEncrypt,
            ..SecurityConfig::default()
        };
        let err = security.validate().unwrap_err();
        assert!(err.contains("certificate"));

        security.certificate = Some(PathBuf::from("/nonexistent/potline/cert.der"));
        security.private_key = Some(PathBuf::from("/nonexistent/potline/key.pem"));
        let err = security.validate().unwrap_err();
        assert!(err.contains("does not exist"));

        let cert = tempfile::NamedTempFile::new().unwrap();
        let key = tempfile::NamedTempFile::new().unwrap();
        security.certificate = Some(cert.path().to_path_buf());
        security.private_key = Some(key.path().to_path_buf());
        assert!(security.validate().is_ok());
    }

    #[test]
    fn test_security_policy_mode_mismatch() {
        let security = SecurityConfig {
            mode: SecurityMode::Sign,
            ..SecurityConfig::default()
        };
        assert!(security.validate().is_err());

        let security = SecurityConfig {
            password: Some("secret".into()),
            ..SecurityConfig::default()
        };
        assert!(security.validate().is_err());
    }

    #[test]
    fn test_to_toml_masks_password() {
        let mut config = BridgeConfig::default();
        config.connection.security.username = Some("operator".into());
        config.connection.security.password = Some("secret".into());
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("[potline.connection]"));
        assert!(rendered.contains("operator"));
        assert!(!rendered.contains("secret"));
    }
}
