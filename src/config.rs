//! Runtime configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use crate::consts::{DEFAULT_DEBOUNCE_MS, MIN_DEBOUNCE_MS};
use crate::persistence::PersistenceConfig;
use crate::store::SessionId;

pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Postgres connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub session_id: SessionId,
    pub campaign_id: Option<String>,
    pub roster_url: Option<String>,
    pub upload_url: Option<String>,
    pub persist_debounce: Duration,
    pub http_timeout: Duration,
}

impl Config {
    /// Build config from the process environment.
    ///
    /// Optional:
    /// - `DATABASE_URL`: Postgres store; in-memory when unset
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `SESSION_ID`: UUID of the session to open; random when unset
    /// - `CAMPAIGN_ID`: roster campaign; empty roster when unset
    /// - `ROSTER_URL`: roster service base URL
    /// - `UPLOAD_URL`: upload service base URL; uploads stay local when unset
    /// - `PERSIST_DEBOUNCE_MS`: default 1000
    /// - `HTTP_TIMEOUT_SECS`: default 30
    ///
    /// # Errors
    ///
    /// Returns an error if `SESSION_ID` is set but is not a UUID.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `SESSION_ID` is set but is not a UUID.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let session_id = match var("SESSION_ID") {
            Some(raw) => Uuid::parse_str(raw.trim())
                .map_err(|e| ConfigError::InvalidValue { var: "SESSION_ID", reason: e.to_string() })?,
            None => Uuid::new_v4(),
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            db_max_connections: env_parse(&var, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            session_id,
            campaign_id: var("CAMPAIGN_ID"),
            roster_url: var("ROSTER_URL"),
            upload_url: var("UPLOAD_URL"),
            persist_debounce: Duration::from_millis(debounce_ms(&var)),
            http_timeout: Duration::from_secs(env_parse(&var, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)),
        })
    }

    #[must_use]
    pub fn persistence(&self) -> PersistenceConfig {
        PersistenceConfig { debounce: self.persist_debounce }
    }
}

/// Debounce window in milliseconds, raised to [`MIN_DEBOUNCE_MS`] so the
/// writer cannot degrade into one write per mutation.
fn debounce_ms<F>(var: &F) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    let ms = env_parse(var, "PERSIST_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS);
    if ms < MIN_DEBOUNCE_MS {
        warn!(value = ms, min = MIN_DEBOUNCE_MS, "PERSIST_DEBOUNCE_MS below minimum; clamping");
        return MIN_DEBOUNCE_MS;
    }
    ms
}

fn env_var(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) => Some(value),
        Err(_) => None,
    }
}

/// Parse a numeric variable, falling back to `default` when unset or invalid.
pub(crate) fn env_parse<T, F>(var: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = %raw, "invalid numeric setting; using default");
            default
        }
    }
}
