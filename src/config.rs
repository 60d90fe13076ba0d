//! Runtime configuration read from the environment (after `.env` is loaded).

use std::time::Duration;

use anyhow::{Context, Result};

use crate::cache::DEFAULT_TTL;
use crate::session::DEFAULT_SESSION_TTL_MINUTES;

pub const DEFAULT_DATA_SOURCE: &str = "CTR_Master_Dataset_2003-2025_CLEANED.csv";
pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Dataset path or URL.
    pub data_source: String,
    pub credentials_path: String,
    pub session_ttl: chrono::Duration,
    pub cache_ttl: Duration,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let session_minutes = match lookup("CTR_SESSION_TTL_MINUTES") {
            Some(raw) => raw
                .parse::<i64>()
                .with_context(|| format!("CTR_SESSION_TTL_MINUTES must be an integer, got '{raw}'"))?,
            None => DEFAULT_SESSION_TTL_MINUTES,
        };
        let cache_ttl = match lookup("CTR_CACHE_TTL_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .with_context(|| format!("CTR_CACHE_TTL_SECS must be an integer, got '{raw}'"))?,
            ),
            None => DEFAULT_TTL,
        };

        Ok(Self {
            data_source: lookup("CTR_DATA_SOURCE").unwrap_or_else(|| DEFAULT_DATA_SOURCE.to_string()),
            credentials_path: lookup("CTR_CREDENTIALS_PATH")
                .unwrap_or_else(|| DEFAULT_CREDENTIALS_PATH.to_string()),
            session_ttl: chrono::Duration::minutes(session_minutes),
            cache_ttl,
            username: lookup("CTR_USERNAME"),
            password: lookup("CTR_PASSWORD"),
        })
    }
}
