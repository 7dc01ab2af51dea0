//! Runtime configuration.
//!
//! Everything is read from environment variables once at startup. A `.env`
//! file in the working directory is honoured for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Feature switches read from the environment
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub analytics: bool,
    pub debug: bool,
    pub mock_data: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the REST backend, e.g. `https://api.example.com/api`
    pub api_base_url: String,
    /// Base URL of the web app; the blob upload route lives under it
    pub app_url: String,
    pub environment: String,
    pub request_timeout: Duration,
    pub token_refresh_interval: Duration,
    pub storage_dir: PathBuf,
    pub blob_token: Option<String>,
    /// `RUST_LOG`-style filter directives, e.g. `info` or `million_listings=debug,reqwest=warn`
    pub log_filter: String,
    pub features: FeatureFlags,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            app_url: "http://localhost:3000".to_string(),
            environment: "production".to_string(),
            request_timeout: Duration::from_secs(30),
            token_refresh_interval: Duration::from_secs(60),
            storage_dir: PathBuf::from(".million"),
            blob_token: None,
            log_filter: "info".to_string(),
            features: FeatureFlags::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// The `.env` file is skipped in test builds so tests stay hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = var("APP_ENV").unwrap_or(defaults.environment);

        // The dev URL only wins in development, and only when it is set.
        let api_base_url = match (environment.as_str(), var("API_DEV_URL")) {
            ("development", Some(dev_url)) => dev_url,
            _ => var("API_BASE_URL").unwrap_or(defaults.api_base_url),
        };
        let api_base_url = validate_url("API_BASE_URL", api_base_url)?;
        let app_url = validate_url("APP_URL", var("APP_URL").unwrap_or(defaults.app_url))?;

        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_secs("REQUEST_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };
        let token_refresh_interval = match var("TOKEN_REFRESH_INTERVAL_SECS") {
            Some(raw) => Duration::from_secs(parse_secs("TOKEN_REFRESH_INTERVAL_SECS", &raw)?),
            None => defaults.token_refresh_interval,
        };

        let storage_dir = var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_dir);

        let features = FeatureFlags {
            analytics: parse_flag("ENABLE_ANALYTICS", var("ENABLE_ANALYTICS"))?,
            debug: parse_flag("ENABLE_DEBUG", var("ENABLE_DEBUG"))?,
            mock_data: parse_flag("USE_MOCK_DATA", var("USE_MOCK_DATA"))?,
        };

        let log_filter = if features.debug {
            "debug".to_string()
        } else {
            let raw = var("RUST_LOG").unwrap_or(defaults.log_filter);
            EnvFilter::try_new(&raw).map_err(|e| {
                ConfigError::InvalidValue("RUST_LOG".to_string(), format!("'{}': {}", raw, e))
            })?;
            raw
        };

        Ok(Self {
            api_base_url,
            app_url,
            environment,
            request_timeout,
            token_refresh_interval,
            storage_dir,
            blob_token: var("BLOB_READ_WRITE_TOKEN"),
            log_filter,
            features,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Subscriber filter built from `log_filter`
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_filter).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn validate_url(key: &str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/').to_string();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed)
    } else {
        Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not an http(s) URL", value),
        ))
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a positive number of seconds", raw),
        )),
    }
}

fn parse_flag(key: &str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a boolean", raw),
        )),
    }
}
