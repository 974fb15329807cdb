//! Translation settings: endpoint, credentials, default languages and cache
//! policy. Loaded from `MEMOCACHE_*` environment variables or a JSON file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::translate::languages::{DEFAULT_SOURCE_LANG, DEFAULT_TARGET_LANG};

pub const ENV_TRANSLATE_URL: &str = "MEMOCACHE_TRANSLATE_URL";
pub const ENV_API_KEY: &str = "MEMOCACHE_API_KEY";
pub const ENV_TIMEOUT_SECS: &str = "MEMOCACHE_TIMEOUT_SECS";
pub const ENV_SOURCE_LANG: &str = "MEMOCACHE_SOURCE_LANG";
pub const ENV_TARGET_LANG: &str = "MEMOCACHE_TARGET_LANG";
pub const ENV_CACHE_DEGRADED: &str = "MEMOCACHE_CACHE_DEGRADED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Base URL; requests go to `<endpoint>/translate`.
    pub endpoint: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub source_lang: String,
    pub target_lang: String,
    /// Cache responses whose service status is not `success` (the text is
    /// usually the untranslated original).
    pub cache_degraded: bool,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".into(),
            api_key: None,
            timeout_secs: 30,
            source_lang: DEFAULT_SOURCE_LANG.into(),
            target_lang: DEFAULT_TARGET_LANG.into(),
            cache_degraded: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value '{value}' for {variable}")]
    InvalidValue { variable: &'static str, value: String },
}

impl TranslateConfig {
    /// Defaults overridden by whichever `MEMOCACHE_*` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by `lookup(variable_name)`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENV_TRANSLATE_URL) {
            config.endpoint = endpoint;
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.is_empty()) {
            config.api_key = Some(key);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                variable: ENV_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
        }
        if let Some(lang) = lookup(ENV_SOURCE_LANG) {
            config.source_lang = lang;
        }
        if let Some(lang) = lookup(ENV_TARGET_LANG) {
            config.target_lang = lang;
        }
        if let Some(raw) = lookup(ENV_CACHE_DEGRADED) {
            config.cache_degraded = parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                variable: ENV_CACHE_DEGRADED,
                value: raw,
            })?;
        }

        Ok(config)
    }

    /// Load from a JSON file. Missing fields keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = TranslateConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, TranslateConfig::default());
        assert_eq!(config.source_lang, "pt-BR");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn overrides_apply() {
        let config = TranslateConfig::from_lookup(lookup_from(&[
            (ENV_TRANSLATE_URL, "https://admin.example.com/api"),
            (ENV_API_KEY, "secret"),
            (ENV_TIMEOUT_SECS, "5"),
            (ENV_TARGET_LANG, "es-ES"),
            (ENV_CACHE_DEGRADED, "off"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, "https://admin.example.com/api");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.target_lang, "es-ES");
        assert!(!config.cache_degraded);
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let config = TranslateConfig::from_lookup(lookup_from(&[(ENV_API_KEY, "")])).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = TranslateConfig::from_lookup(lookup_from(&[(ENV_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                variable: ENV_TIMEOUT_SECS,
                ..
            }
        ));

        let err = TranslateConfig::from_lookup(lookup_from(&[(ENV_CACHE_DEGRADED, "maybe")])).unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: TranslateConfig =
            serde_json::from_str(r#"{"endpoint":"http://10.0.0.2:9000","cache_degraded":false}"#).unwrap();
        assert_eq!(config.endpoint, "http://10.0.0.2:9000");
        assert!(!config.cache_degraded);
        assert_eq!(config.target_lang, "en-US");
    }
}
