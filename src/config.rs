//! Environment-driven configuration
//!
//! Values are read from the process environment after loading an optional
//! `.env` file. Numeric values that fail to parse fall back to their defaults.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown storage backend {0:?} (expected memory, sqlite or redb)")]
    UnknownBackend(String),
}

/// Storage technology backing the bookmark repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
    Redb,
}

impl StorageBackend {
    /// Database path used when `DATABASE_URL` is unset.
    pub fn default_path(&self) -> &'static str {
        match self {
            Self::Memory => "",
            Self::Sqlite => "athena.sqlite3",
            Self::Redb => "athena.redb",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "sqlite" | "sql" => Ok(Self::Sqlite),
            "redb" | "document" => Ok(Self::Redb),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
            Self::Redb => "redb",
        })
    }
}

/// Runtime configuration for the server binary
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: StorageBackend,
    /// File path of the sqlite or redb database
    pub database_url: String,
    /// Upper bound for a single page fetch during enrichment
    pub fetch_timeout: Duration,
    /// Shared secret expected in the `Authorization` header, if any
    pub auth_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            backend: StorageBackend::default(),
            database_url: String::new(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            auth_token: None,
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `PORT` - Server port number (default: 8080)
    /// - `STORAGE_BACKEND` - `memory`, `sqlite` or `redb` (default: memory)
    /// - `DATABASE_URL` - Path to the database file (default depends on backend)
    /// - `FETCH_TIMEOUT_SECS` - Page fetch timeout (default: 10)
    /// - `AUTHORIZATION` - Shared secret for `/api` routes (unset disables it)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let backend = match lookup("STORAGE_BACKEND") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => StorageBackend::default(),
        };

        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| backend.default_path().to_string());

        let fetch_timeout = lookup("FETCH_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS));

        let auth_token = lookup("AUTHORIZATION").filter(|v| !v.is_empty());

        Ok(Self {
            port,
            backend,
            database_url,
            fetch_timeout,
            auth_token,
        })
    }
}
