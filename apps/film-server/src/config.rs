// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup and passed
//! down explicitly. Nothing reads the environment after `AppConfig::from_env`.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `credentials.redb` | `./data` |
//! | `JWT_SECRET` | HS256 signing secret, at least 32 bytes | Required |
//! | `ACCESS_TOKEN_TTL_SECS` | Access token lifetime | `3600` |
//! | `REFRESH_TOKEN_TTL_SECS` | Refresh token lifetime | `172800` |
//! | `STORE_TIMEOUT_MS` | Deadline for a single store call | `5000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const ACCESS_TOKEN_TTL_ENV: &str = "ACCESS_TOKEN_TTL_SECS";
pub const REFRESH_TOKEN_TTL_ENV: &str = "REFRESH_TOKEN_TTL_SECS";
pub const STORE_TIMEOUT_ENV: &str = "STORE_TIMEOUT_MS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// File name of the database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "credentials.redb";

/// Minimum accepted length of `JWT_SECRET`, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_ACCESS_TTL_SECS: u64 = 60 * 60;
const DEFAULT_REFRESH_TTL_SECS: u64 = 48 * 60 * 60;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

/// Upper bound for either token lifetime.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("JWT_SECRET must be at least {min} bytes (got {0})", min = MIN_SECRET_LEN)]
    SecretTooShort(usize),

    #[error("{name} must be between 1 second and {max} seconds (got {secs})", max = MAX_TOKEN_TTL.as_secs())]
    TtlOutOfRange { name: &'static str, secs: u64 },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Signing secret and token lifetimes, shared by the token codec and the
/// auth flow.
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: Vec<u8>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl AuthSettings {
    pub fn new(
        jwt_secret: impl Into<Vec<u8>>,
        access_token_ttl: Duration,
        refresh_token_ttl: Duration,
    ) -> Result<Self, ConfigError> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort(jwt_secret.len()));
        }
        check_ttl(ACCESS_TOKEN_TTL_ENV, access_token_ttl)?;
        check_ttl(REFRESH_TOKEN_TTL_ENV, refresh_token_ttl)?;
        Ok(Self {
            jwt_secret,
            access_token_ttl,
            refresh_token_ttl,
        })
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub auth: AuthSettings,
    pub store_timeout: Duration,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let bind_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid {
                name: HOST_ENV,
                value: host.clone(),
            })?;

        let data_dir = PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.into()));

        let secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        let access_ttl = parse_or(
            get(ACCESS_TOKEN_TTL_ENV),
            ACCESS_TOKEN_TTL_ENV,
            DEFAULT_ACCESS_TTL_SECS,
        )?;
        let refresh_ttl = parse_or(
            get(REFRESH_TOKEN_TTL_ENV),
            REFRESH_TOKEN_TTL_ENV,
            DEFAULT_REFRESH_TTL_SECS,
        )?;
        let auth = AuthSettings::new(
            secret.into_bytes(),
            Duration::from_secs(access_ttl),
            Duration::from_secs(refresh_ttl),
        )?;

        let store_timeout_ms = parse_or(
            get(STORE_TIMEOUT_ENV),
            STORE_TIMEOUT_ENV,
            DEFAULT_STORE_TIMEOUT_MS,
        )?;

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                value,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            data_dir,
            auth,
            store_timeout: Duration::from_millis(store_timeout_ms),
            log_format,
        })
    }

    /// Full path of the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn check_ttl(name: &'static str, ttl: Duration) -> Result<(), ConfigError> {
    if ttl.is_zero() || ttl > MAX_TOKEN_TTL {
        return Err(ConfigError::TtlOutOfRange {
            name,
            secs: ttl.as_secs(),
        });
    }
    Ok(())
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = config_from(&[(JWT_SECRET_ENV, SECRET)]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.database_path(), PathBuf::from("./data/credentials.redb"));
        assert_eq!(config.auth.access_token_ttl, Duration::from_secs(3600));
        assert_eq!(config.auth.refresh_token_ttl, Duration::from_secs(172_800));
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn secret_is_required_and_must_be_long_enough() {
        assert_eq!(
            config_from(&[]).unwrap_err(),
            ConfigError::Missing(JWT_SECRET_ENV)
        );
        assert_eq!(
            config_from(&[(JWT_SECRET_ENV, "short")]).unwrap_err(),
            ConfigError::SecretTooShort(5)
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            (JWT_SECRET_ENV, SECRET),
            (HOST_ENV, "127.0.0.1"),
            (PORT_ENV, "9000"),
            (DATA_DIR_ENV, "/var/lib/films"),
            (ACCESS_TOKEN_TTL_ENV, "60"),
            (STORE_TIMEOUT_ENV, "250"),
            (LOG_FORMAT_ENV, "JSON"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/films/credentials.redb")
        );
        assert_eq!(config.auth.access_token_ttl, Duration::from_secs(60));
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = config_from(&[(JWT_SECRET_ENV, SECRET), (PORT_ENV, "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: PORT_ENV,
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn token_lifetimes_must_be_in_range() {
        let err = config_from(&[
            (JWT_SECRET_ENV, SECRET),
            (REFRESH_TOKEN_TTL_ENV, "10000000000000"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::TtlOutOfRange {
                name: REFRESH_TOKEN_TTL_ENV,
                secs: 10_000_000_000_000
            }
        );

        let err = config_from(&[(JWT_SECRET_ENV, SECRET), (ACCESS_TOKEN_TTL_ENV, "0")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::TtlOutOfRange {
                name: ACCESS_TOKEN_TTL_ENV,
                secs: 0
            }
        );

        let max = MAX_TOKEN_TTL.as_secs().to_string();
        let config =
            config_from(&[(JWT_SECRET_ENV, SECRET), (REFRESH_TOKEN_TTL_ENV, max.as_str())]).unwrap();
        assert_eq!(config.auth.refresh_token_ttl, MAX_TOKEN_TTL);
    }

    #[test]
    fn debug_redacts_secret() {
        let settings =
            AuthSettings::new(SECRET, Duration::from_secs(1), Duration::from_secs(1)).unwrap();
        assert!(!format!("{settings:?}").contains(SECRET));
    }
}
