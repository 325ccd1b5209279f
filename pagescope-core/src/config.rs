//! Layered settings: built-in defaults, then `<dir>/<env>.json`, then `PAGESCOPE_*`
//! environment variables. Command line flags are applied on top by the binary.

use pagescope_scanner::{
    DEFAULT_LINK_TIMEOUT, DEFAULT_LOGIN_THRESHOLD, DEFAULT_MAX_LINKS, DEFAULT_WORKERS,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::cache::DEFAULT_CACHE_TTL;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/pagescope";
pub const DEFAULT_ENVIRONMENT: &str = "dev";
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
pub const ENV_PREFIX: &str = "PAGESCOPE_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Malformed settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "console" | "text" => Ok(LogFormat::Console),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {}", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Console => f.write_str("console"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    pub max_links: usize,
    pub max_workers: usize,
    pub link_timeout_secs: u64,
    /// 0 disables redirect following.
    pub max_redirects: usize,
    pub login_threshold: u32,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            max_links: DEFAULT_MAX_LINKS,
            max_workers: DEFAULT_WORKERS,
            link_timeout_secs: DEFAULT_LINK_TIMEOUT.as_secs(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            login_threshold: DEFAULT_LOGIN_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub path: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            path: format!("{}/cache.db", DEFAULT_CONFIG_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Console,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analyzer: AnalyzerSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

/// Active environment name from `PAGESCOPE_ENV`, `dev` when unset.
pub fn environment() -> String {
    std::env::var(format!("{}ENV", ENV_PREFIX))
        .ok()
        .filter(|env| !env.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

pub fn default_config_dir() -> PathBuf {
    PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_DIR).as_ref())
}

/// Path of the settings file for `env` inside `dir`.
pub fn settings_path(dir: &Path, env: &str) -> PathBuf {
    dir.join(format!("{}.json", env))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

impl Settings {
    /// Read `<dir>/<env>.json` (defaults when missing), apply environment overrides and
    /// normalize.
    pub fn load(dir: &Path, env: &str) -> Result<Self> {
        let path = settings_path(dir, env);
        let settings = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        settings.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `PAGESCOPE_*` overrides obtained through `lookup`, then normalize.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((key, value)) = var("MAX_LINKS") {
            self.analyzer.max_links = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = var("MAX_WORKERS") {
            self.analyzer.max_workers = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = var("LINK_TIMEOUT") {
            self.analyzer.link_timeout_secs = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = var("MAX_REDIRECTS") {
            self.analyzer.max_redirects = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = var("CACHE_ENABLED") {
            self.cache.enabled = parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = var("CACHE_TTL") {
            self.cache.ttl_secs = parse_value(&key, &value)?;
        }
        if let Some((_, value)) = var("CACHE_PATH") {
            self.cache.path = value.trim().to_string();
        }
        if let Some((_, value)) = var("LOG_LEVEL") {
            self.logging.level = value.trim().to_string();
        }
        if let Some((key, value)) = var("LOG_FORMAT") {
            self.logging.format = value.parse().map_err(|_| ConfigError::InvalidValue {
                key,
                value: value.clone(),
            })?;
        }

        Ok(self.normalized())
    }

    /// Replace zero or empty values with their defaults.
    pub fn normalized(mut self) -> Self {
        let analyzer = AnalyzerSettings::default();
        if self.analyzer.max_links == 0 {
            self.analyzer.max_links = analyzer.max_links;
        }
        if self.analyzer.max_workers == 0 {
            self.analyzer.max_workers = analyzer.max_workers;
        }
        if self.analyzer.link_timeout_secs == 0 {
            self.analyzer.link_timeout_secs = analyzer.link_timeout_secs;
        }
        if self.analyzer.login_threshold == 0 {
            self.analyzer.login_threshold = analyzer.login_threshold;
        }

        let cache = CacheSettings::default();
        if self.cache.ttl_secs == 0 {
            self.cache.ttl_secs = cache.ttl_secs;
        }
        if self.cache.path.trim().is_empty() {
            self.cache.path = cache.path;
        }

        if self.logging.level.trim().is_empty() {
            self.logging.level = LoggingSettings::default().level;
        }

        self
    }

    pub fn link_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer.link_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Cache database location with `~` expanded.
    pub fn cache_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.cache.path).as_ref())
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.analyzer.max_links, 100);
        assert_eq!(settings.analyzer.max_workers, 20);
        assert_eq!(settings.link_timeout(), Duration::from_secs(10));
        assert_eq!(settings.analyzer.max_redirects, 5);
        assert_eq!(settings.analyzer.login_threshold, 10);
        assert!(settings.cache.enabled);
        assert_eq!(settings.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.logging.format, LogFormat::Console);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("console".parse::<LogFormat>(), Ok(LogFormat::Console));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_cache_path() {
        let settings = Settings::default();
        let path = Settings {
            cache: CacheSettings {
                path: "/var/tmp/pagescope/cache.db".to_string(),
                ..Default::default()
            },
            ..settings
        }
        .cache_path();
        assert_eq!(path, PathBuf::from("/var/tmp/pagescope/cache.db"));
        assert!(Settings::default().cache_path().ends_with("pagescope/cache.db"));
    }
}
