use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::ConfigError;

const DEFAULT_PORT: &str = "8000";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_MAX_PORT_FALLBACK: &str = "10";

const DEFAULT_DB_HOST: &str = "127.0.0.1";
const DEFAULT_DB_USER: &str = "root";
const DEFAULT_DB_PASSWORD: &str = "root";
const DEFAULT_DB_NAME: &str = "webdb";
const DEFAULT_DB_PORT: &str = "8820";
const DEFAULT_DB_POOL_SIZE: &str = "10";
const DEFAULT_DB_CONNECT_RETRIES: &str = "10";
const DEFAULT_DB_RETRY_DELAY_MS: &str = "2000";
const DEFAULT_DB_CONNECT_TIMEOUT_MS: &str = "5000";
const DEFAULT_DB_ACQUIRE_TIMEOUT_MS: &str = "10000";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub max_port_fallback: u32,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
    pub port: u16,
    /// Full connection URL, takes precedence over the individual parts.
    pub url: Option<String>,
    pub pool_size: u32,
    pub connect_retries: u32,
    pub retry_delay: Duration,
    /// Upper bound for a single connection attempt and for health checks.
    pub connect_timeout: Duration,
    /// How long a request waits for a free pooled connection.
    pub acquire_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("PORT", DEFAULT_PORT)?,
            host: try_load("HOST", DEFAULT_HOST)?,
            max_port_fallback: try_load("MAX_PORT_FALLBACK", DEFAULT_MAX_PORT_FALLBACK)?,
            database: DatabaseConfig::load()?,
        })
    }
}

impl DatabaseConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            host: try_load("DB_HOST", DEFAULT_DB_HOST)?,
            user: try_load("DB_USER", DEFAULT_DB_USER)?,
            password: read_secret("DB_PASSWORD", DEFAULT_DB_PASSWORD),
            name: try_load("DB_NAME", DEFAULT_DB_NAME)?,
            port: try_load("DB_PORT", DEFAULT_DB_PORT)?,
            url: var("DATABASE_URL").ok(),
            pool_size: try_load("DB_POOL_SIZE", DEFAULT_DB_POOL_SIZE)?,
            connect_retries: try_load("DB_CONNECT_RETRIES", DEFAULT_DB_CONNECT_RETRIES)?,
            retry_delay: Duration::from_millis(try_load(
                "DB_RETRY_DELAY_MS",
                DEFAULT_DB_RETRY_DELAY_MS,
            )?),
            connect_timeout: Duration::from_millis(try_load(
                "DB_CONNECT_TIMEOUT_MS",
                DEFAULT_DB_CONNECT_TIMEOUT_MS,
            )?),
            acquire_timeout: Duration::from_millis(try_load(
                "DB_ACQUIRE_TIMEOUT_MS",
                DEFAULT_DB_ACQUIRE_TIMEOUT_MS,
            )?),
        })
    }

    /// Single-connection SQLite target, e.g. `sqlite::memory:`.
    pub fn sqlite(url: &str) -> Self {
        Self {
            host: DEFAULT_DB_HOST.to_string(),
            user: DEFAULT_DB_USER.to_string(),
            password: DEFAULT_DB_PASSWORD.to_string(),
            name: DEFAULT_DB_NAME.to_string(),
            port: 0,
            url: Some(url.to_string()),
            pool_size: 1,
            connect_retries: 1,
            retry_delay: Duration::ZERO,
            connect_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(5),
        }
    }

    pub fn url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "mysql://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.name
            ),
        }
    }

    pub fn is_sqlite(&self) -> bool {
        self.url().starts_with("sqlite:")
    }

    /// Connection target without credentials, safe to log.
    pub fn describe(&self) -> String {
        match &self.url {
            Some(url) if self.is_sqlite() => url.clone(),
            Some(_) => "DATABASE_URL".to_string(),
            None => format!(
                "host: {} port: {} database: {}",
                self.host, self.port, self.name
            ),
        }
    }
}

fn var(key: &str) -> Result<String, env::VarError> {
    env::var(key)
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");

        ConfigError::Invalid {
            key: key.to_string(),
            value,
            reason: e.to_string(),
        }
    })
}

fn read_secret(secret_name: &str, default: &str) -> String {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .or_else(|_| var(secret_name))
        .unwrap_or_else(|_| {
            info!("{secret_name} not set, using default");
            default.to_string()
        })
}
