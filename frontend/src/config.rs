use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{debug, warn};

use crate::error::ConfigError;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_CANDIDATES: &str = "8000,8001,8002,8003,8004";
const DEFAULT_PROBE_TIMEOUT_MS: &str = "1500";

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    /// Probe order, first entry has the highest priority.
    pub candidates: Vec<u16>,
    pub default_port: u16,
    pub probe_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            candidates: vec![8000, 8001, 8002, 8003, 8004],
            default_port: DEFAULT_PORT,
            probe_timeout: Duration::from_millis(1500),
        }
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let candidates = var("API_PORT_CANDIDATES", DEFAULT_CANDIDATES);

        Ok(Self {
            host: var("API_HOST", DEFAULT_HOST),
            candidates: parse_ports("API_PORT_CANDIDATES", &candidates)?,
            default_port: DEFAULT_PORT,
            probe_timeout: Duration::from_millis(parse(
                "API_PROBE_TIMEOUT_MS",
                &var("API_PROBE_TIMEOUT_MS", DEFAULT_PROBE_TIMEOUT_MS),
            )?),
        })
    }
}

fn var(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        debug!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");

        ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Comma separated port list, blanks ignored, order kept.
pub fn parse_ports(key: &str, value: &str) -> Result<Vec<u16>, ConfigError> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| parse(key, part))
        .collect()
}
