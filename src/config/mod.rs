use std::str::FromStr;
use std::{env, fmt};

use sqlx::postgres::PgConnectOptions;

use thiserror::Error;
use tracing::{info, warn};

use crate::validation::UsnPolicy;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Minimum length the cookie encryption key derivation accepts.
pub const MIN_SESSION_SECRET_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct Config {
    pub database: PgConnectOptions,
    pub max_connections: u32,
    pub admin: AdminCredentials,
    pub session_secret: String,
    pub usn_policy: UsnPolicy,
    pub port: u16,
    pub cors_allowed_origins: Option<String>,
    pub production: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("max_connections", &self.max_connections)
            .field("admin", &self.admin)
            .field("usn_policy", &self.usn_policy)
            .field("port", &self.port)
            .field("production", &self.production)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests never touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        // Built from parts rather than a formatted URL, so passwords need no
        // percent-encoding.
        let database = match get("DATABASE_URL") {
            Some(url) => PgConnectOptions::from_str(&url).map_err(|e| ConfigError::Invalid {
                key: "DATABASE_URL",
                message: e.to_string(),
            })?,
            None => {
                let host = get("DB_HOST").unwrap_or_else(|| "localhost".to_string());
                let user = get("DB_USER").unwrap_or_else(|| "postgres".to_string());
                let name = get("DB_NAME").unwrap_or_else(|| "event_portal".to_string());
                info!("DATABASE_URL not set, connecting to {name} on {host} as {user}");
                let options = PgConnectOptions::new()
                    .host(&host)
                    .username(&user)
                    .database(&name);
                match get("DB_PASSWORD") {
                    Some(password) => options.password(&password),
                    None => options,
                }
            }
        };

        let admin = AdminCredentials {
            username: get("ADMIN_USERNAME").ok_or(ConfigError::Missing("ADMIN_USERNAME"))?,
            password: get("ADMIN_PASSWORD").ok_or(ConfigError::Missing("ADMIN_PASSWORD"))?,
        };

        let session_secret = get("SESSION_SECRET").ok_or(ConfigError::Missing("SESSION_SECRET"))?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: "SESSION_SECRET",
                message: format!("must be at least {MIN_SESSION_SECRET_LEN} bytes"),
            });
        }

        let usn_policy = match get("USN_FORMAT") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::Invalid {
                key: "USN_FORMAT",
                message,
            })?,
            None => UsnPolicy::default(),
        };

        Ok(Self {
            database,
            max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), DEFAULT_MAX_CONNECTIONS)?,
            admin,
            session_secret,
            usn_policy,
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS"),
            production: get("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                message: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
