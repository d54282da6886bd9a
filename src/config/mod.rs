//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::game::constants::{HEARTBEAT_INTERVAL_SECS, ROUND_ADVANCE_MS};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Score table file
    pub stats_path: PathBuf,
    /// Allowed client origins for CORS, empty means any
    pub client_origins: Vec<String>,

    /// Pause between a shot and the next round
    pub round_advance_delay: Duration,
    /// Liveness sweep period
    pub heartbeat_interval: Duration,
    /// Fixed seed for round generation, random when unset
    pub game_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let round_advance_ms: u64 = parse_or(&lookup, "ROUND_ADVANCE_MS", ROUND_ADVANCE_MS)?;
        let heartbeat_secs: u64 =
            parse_or(&lookup, "HEARTBEAT_INTERVAL_SECS", HEARTBEAT_INTERVAL_SECS)?;
        if heartbeat_secs == 0 {
            return Err(ConfigError::Invalid("HEARTBEAT_INTERVAL_SECS"));
        }

        let game_seed = match lookup("GAME_SEED") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid("GAME_SEED"))?),
            None => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            stats_path: lookup("STATS_PATH")
                .unwrap_or_else(|| "statistics.json".to_string())
                .into(),
            client_origins,

            round_advance_delay: Duration::from_millis(round_advance_ms),
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            game_seed,
        })
    }

    /// Round advance delay in whole milliseconds, saturating
    pub fn round_advance_ms(&self) -> u64 {
        u64::try_from(self.round_advance_delay.as_millis()).unwrap_or(u64::MAX)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
