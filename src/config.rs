// src/config.rs
//! Process configuration read from the environment (after `.env`, if any).
//!
//! Every loader takes a lookup function so tests can supply a map instead
//! of touching the real environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use thiserror::Error;

use crate::auth::TokenConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Loads `.env` into the process environment if the file exists.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }
}

/// Reads from the process environment.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        _ => Ok(default),
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub connect: PgConnectOptions,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// `DATABASE_URL`, or connection options built from `DB_HOST`, `DB_PORT`,
    /// `DB_USER`, `DB_PASSWORD` and `DB_NAME`.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let connect = match lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            Some(url) => PgConnectOptions::from_str(&url).map_err(|_| ConfigError::Invalid {
                key: "DATABASE_URL",
                value: "<redacted>".to_string(),
            })?,
            None => {
                let host = required(lookup, "DB_HOST")?;
                let port: u16 = parse_or(lookup, "DB_PORT", 5432)?;
                let user = required(lookup, "DB_USER")?;
                let name = required(lookup, "DB_NAME")?;

                let mut connect = PgConnectOptions::new()
                    .host(&host)
                    .port(port)
                    .username(&user)
                    .database(&name)
                    .ssl_mode(PgSslMode::Disable);
                if let Some(password) = lookup("DB_PASSWORD").filter(|v| !v.is_empty()) {
                    connect = connect.password(&password);
                }
                connect
            }
        };

        Ok(Self {
            connect,
            max_connections: parse_or(lookup, "DB_MAX_CONNECTIONS", 5)?,
        })
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.connect.get_host())
            .field("port", &self.connect.get_port())
            .field("database", &self.connect.get_database())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    fn from_lookup<F>(lookup: &F, addr_key: &'static str, default_addr: SocketAddr) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            bind_addr: parse_or(lookup, addr_key, default_addr)?,
            shutdown_grace: Duration::from_secs(parse_or(lookup, "SHUTDOWN_GRACE_SECS", 10)?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PollServiceConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth_verify_url: String,
    pub auth_timeout: Duration,
    pub reject_duplicate_votes: bool,
}

impl PollServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            server: ServerConfig::from_lookup(lookup, "POLL_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?,
            database: DatabaseConfig::from_lookup(lookup)?,
            auth_verify_url: lookup("AUTH_VERIFY_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "http://localhost:9000/verify".to_string()),
            auth_timeout: Duration::from_secs(parse_or(lookup, "AUTH_TIMEOUT_SECS", 5)?),
            reject_duplicate_votes: parse_or(lookup, "REJECT_DUPLICATE_VOTES", false)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub token: TokenConfig,
    pub bcrypt_cost: u32,
}

impl AuthServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ttl = Duration::from_secs(parse_or(lookup, "AUTH_TOKEN_TTL_SECS", 24 * 60 * 60)?);
        let token = TokenConfig::new(required(lookup, "AUTH_TOKEN_SECRET")?).with_ttl(ttl);
        token.validate()?;

        let bcrypt_cost = parse_or(lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        Ok(Self {
            server: ServerConfig::from_lookup(lookup, "AUTH_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 9000)))?,
            database: DatabaseConfig::from_lookup(lookup)?,
            token,
            bcrypt_cost,
        })
    }
}
