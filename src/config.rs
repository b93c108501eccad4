use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub catalog_path: Option<PathBuf>,
    pub currency: String,
    pub max_sessions: usize,
    pub session_idle: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let currency: String = try_load(&lookup, "STORE_CURRENCY", "USD")?;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::Invalid {
                key: "STORE_CURRENCY",
                value: currency,
                reason: "expected a three-letter ISO 4217 code".to_string(),
            });
        }

        let max_sessions: usize = try_load(&lookup, "MAX_SESSIONS", "10000")?;
        if max_sessions == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_SESSIONS",
                value: max_sessions.to_string(),
                reason: "must allow at least one session".to_string(),
            });
        }

        Ok(Self {
            host: try_load(&lookup, "HOST", "0.0.0.0")?,
            port: try_load(&lookup, "PORT", "8083")?,
            catalog_path: lookup("CATALOG_PATH").filter(|p| !p.is_empty()).map(PathBuf::from),
            currency,
            max_sessions,
            session_idle: Duration::from_secs(try_load(&lookup, "SESSION_IDLE_SECS", "1800")?),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError::Invalid { key, reason: e.to_string(), value })
}
