// Configuration loaded from the process environment

use std::{env, str::FromStr, time::Duration};

use crate::auth::{password::HashingCost, service::DEFAULT_TOKEN_TTL_HOURS};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration for the server
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub token_ttl: chrono::Duration,
    pub hashing_cost: HashingCost,
    pub request_timeout: Duration,
}

impl Config {
    /// Read configuration from environment variables.
    ///
    /// Only `DATABASE_URL` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Config::from_env`] but reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 8080u16)?;

        let ttl_hours = parse_or(&lookup, "AUTH_TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?;
        if ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                name: "AUTH_TOKEN_TTL_HOURS",
                value: ttl_hours.to_string(),
            });
        }

        let defaults = HashingCost::default();
        let hashing_cost = HashingCost {
            memory_kib: parse_or(&lookup, "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&lookup, "ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&lookup, "ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        let timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?;

        Ok(Self {
            database_url,
            host,
            port,
            token_ttl: chrono::Duration::hours(ttl_hours),
            hashing_cost,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
