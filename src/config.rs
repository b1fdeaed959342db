// ⚙️ Configuration
// Endpoints and passcode come from the environment (a `.env` file is honoured)

use crate::catalog::DEFAULT_CATALOG_TTL_SECS;
use crate::fetcher::DEFAULT_TIMEOUT;
use std::time::Duration;

pub const ENV_CATALOG_URL: &str = "IPO_CATALOG_URL";
pub const ENV_ALLOTMENT_URL: &str = "IPO_ALLOTMENT_URL";
pub const ENV_PASSCODE: &str = "IPO_PASSCODE";
pub const ENV_TIMEOUT_SECS: &str = "IPO_HTTP_TIMEOUT_SECS";
pub const ENV_CATALOG_TTL_SECS: &str = "IPO_CATALOG_TTL_SECS";
pub const ENV_SERVER_ADDR: &str = "IPO_SERVER_ADDR";
pub const ENV_LOG_FILE: &str = "IPO_LOG_FILE";

const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// Runtime settings. `Debug` redacts the passcode.
#[derive(Clone)]
pub struct AppConfig {
    pub catalog_url: String,
    pub allotment_url: String,
    pub passcode: String,
    pub timeout: Duration,
    pub catalog_ttl: chrono::Duration,
    pub server_addr: String,
    pub log_file: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("catalog_url", &self.catalog_url)
            .field("allotment_url", &self.allotment_url)
            .field("passcode", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("catalog_ttl", &self.catalog_ttl)
            .field("server_addr", &self.server_addr)
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl AppConfig {
    pub fn new(
        catalog_url: impl Into<String>,
        allotment_url: impl Into<String>,
        passcode: impl Into<String>,
    ) -> Self {
        AppConfig {
            catalog_url: catalog_url.into(),
            allotment_url: allotment_url.into(),
            passcode: passcode.into(),
            timeout: DEFAULT_TIMEOUT,
            catalog_ttl: chrono::Duration::seconds(DEFAULT_CATALOG_TTL_SECS),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            log_file: None,
        }
    }

    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::Missing(key.to_string()));

        let mut config = AppConfig::new(
            require(ENV_CATALOG_URL)?,
            require(ENV_ALLOTMENT_URL)?,
            require(ENV_PASSCODE)?,
        );

        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            config.timeout = Duration::from_secs(parse_positive(ENV_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = get(ENV_CATALOG_TTL_SECS) {
            config.catalog_ttl = chrono::Duration::seconds(parse_positive(ENV_CATALOG_TTL_SECS, &raw)? as i64);
        }
        if let Some(addr) = get(ENV_SERVER_ADDR) {
            config.server_addr = addr;
        }
        config.log_file = get(ENV_LOG_FILE);

        for (key, url) in [(ENV_CATALOG_URL, &config.catalog_url), (ENV_ALLOTMENT_URL, &config.allotment_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(key.to_string(), url.clone()));
            }
        }

        Ok(config)
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid(key.to_string(), raw.to_string())),
    }
}
