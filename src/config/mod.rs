//! Configuration module for the queue store.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::api::ApiConfig;
use crate::engine::{EngineSettings, DEFAULT_INSTITUTION};
use crate::errors::AppError;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// First line of every receipt
    pub institution_name: String,
    pub reset_counters_on_archive: bool,
    /// Poll period for detecting writes from other processes
    pub watch_interval: Duration,
    pub api_enabled: bool,
    pub api_base_url: String,
    pub api_timeout: Duration,
    pub api_refresh_skew: Duration,
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            db_path: text("IMTSB_DB_PATH", "./data/imtsb.sqlite").into(),
            log_level: text("IMTSB_LOG_LEVEL", "info"),
            log_format: parse(&lookup, "IMTSB_LOG_FORMAT", LogFormat::Text)?,
            institution_name: text("IMTSB_INSTITUTION_NAME", DEFAULT_INSTITUTION),
            reset_counters_on_archive: flag(&lookup, "IMTSB_RESET_COUNTERS_ON_ARCHIVE", true)?,
            watch_interval: Duration::from_millis(parse(
                &lookup,
                "IMTSB_WATCH_INTERVAL_MS",
                1000u64,
            )?),
            api_enabled: flag(&lookup, "IMTSB_API_ENABLED", false)?,
            api_base_url: text("IMTSB_API_BASE_URL", "/api"),
            api_timeout: Duration::from_millis(parse(&lookup, "IMTSB_API_TIMEOUT_MS", 15_000u64)?),
            api_refresh_skew: Duration::from_secs(parse(
                &lookup,
                "IMTSB_API_REFRESH_SKEW_SEC",
                30u64,
            )?),
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            institution_name: self.institution_name.clone(),
            reset_counters_on_archive: self.reset_counters_on_archive,
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            enabled: self.api_enabled,
            base_url: self.api_base_url.clone(),
            timeout: self.api_timeout,
            refresh_skew: self.api_refresh_skew,
        }
    }
}

fn parse<T, F>(lookup: &F, name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid {}: {}", name, e))),
    }
}

fn flag<F>(lookup: &F, name: &str, default: bool) -> Result<bool, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name).filter(|v| !v.trim().is_empty()) else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Validation(format!(
            "Invalid {}: expected a boolean, got '{}'",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const VARS: [&str; 10] = [
        "IMTSB_DB_PATH",
        "IMTSB_LOG_LEVEL",
        "IMTSB_LOG_FORMAT",
        "IMTSB_INSTITUTION_NAME",
        "IMTSB_RESET_COUNTERS_ON_ARCHIVE",
        "IMTSB_WATCH_INTERVAL_MS",
        "IMTSB_API_ENABLED",
        "IMTSB_API_BASE_URL",
        "IMTSB_API_TIMEOUT_MS",
        "IMTSB_API_REFRESH_SKEW_SEC",
    ];

    fn from_map(pairs: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        for name in VARS {
            env::remove_var(name);
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.db_path, PathBuf::from("./data/imtsb.sqlite"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.institution_name, DEFAULT_INSTITUTION);
        assert!(config.reset_counters_on_archive);
        assert_eq!(config.watch_interval, Duration::from_millis(1000));
        assert!(!config.api_enabled);
        assert_eq!(config.api_base_url, "/api");
        assert_eq!(config.api_timeout, Duration::from_millis(15_000));
        assert_eq!(config.api_refresh_skew, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("IMTSB_LOG_FORMAT", "JSON"),
            ("IMTSB_RESET_COUNTERS_ON_ARCHIVE", "no"),
            ("IMTSB_API_ENABLED", "1"),
            ("IMTSB_API_TIMEOUT_MS", " 500 "),
        ])
        .unwrap();

        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.engine_settings().reset_counters_on_archive);
        let api = config.api_config();
        assert!(api.enabled);
        assert_eq!(api.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_malformed_values_name_the_variable() {
        let err = from_map(&[("IMTSB_WATCH_INTERVAL_MS", "soon")]).unwrap_err();
        assert!(matches!(&err, AppError::Validation(m) if m.contains("IMTSB_WATCH_INTERVAL_MS")));

        let err = from_map(&[("IMTSB_API_ENABLED", "maybe")]).unwrap_err();
        assert!(matches!(&err, AppError::Validation(m) if m.contains("IMTSB_API_ENABLED")));

        assert!(from_map(&[("IMTSB_LOG_FORMAT", "xml")]).is_err());
    }
}
