// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup; invalid values are startup errors.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Bind IP (IPv4, IPv6 or `localhost`) | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for user records and avatars | `./data` |
//! | `SESSION_SECRET` | HS256 secret for session tokens (>= 32 bytes) | Required |
//! | `SESSION_TTL_SECS` | Lifetime of issued session tokens | `604800` |
//! | `PROTECTED_PREFIXES` | Comma-separated path prefixes behind the gate | `/account` |
//! | `UNAUTHENTICATED_REDIRECT` | Where the gate sends anonymous visitors | `/signup` |
//! | `COOKIE_SECURE` | Set `Secure` on session cookies | `true` |
//! | `PUBLIC_BASE_URL` | Base URL for verification links | `http://localhost:8080` |
//! | `AVATAR_BASE_URL` | Public prefix of stored avatars | `/avatars` |
//! | `MAIL_WEBHOOK_URL` | Mail relay endpoint; mail is only logged if unset | Optional |
//! | `EMAIL_VERIFICATION_TTL_SECS` | Lifetime of verification links | `86400` |
//! | `SEED_USER_EMAIL` | Bootstrap user email | Optional |
//! | `SEED_USER_PASSWORD` | Bootstrap user password | Optional |
//! | `SEED_USER_NAME` | Bootstrap user display name | `Admin` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use chrono::Duration;
use url::Url;

use crate::auth::GateConfig;
use crate::storage::paths::DATA_ROOT;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// Holds `users/` and `avatars/`.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Shared secret for HS256 session tokens and verification link MACs.
pub const SESSION_SECRET_ENV: &str = "SESSION_SECRET";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";

/// Comma-separated list, e.g. `/account,/settings`.
pub const PROTECTED_PREFIXES_ENV: &str = "PROTECTED_PREFIXES";
pub const UNAUTHENTICATED_REDIRECT_ENV: &str = "UNAUTHENTICATED_REDIRECT";
pub const COOKIE_SECURE_ENV: &str = "COOKIE_SECURE";

pub const PUBLIC_BASE_URL_ENV: &str = "PUBLIC_BASE_URL";
pub const AVATAR_BASE_URL_ENV: &str = "AVATAR_BASE_URL";
pub const MAIL_WEBHOOK_URL_ENV: &str = "MAIL_WEBHOOK_URL";
pub const EMAIL_VERIFICATION_TTL_ENV: &str = "EMAIL_VERIFICATION_TTL_SECS";

pub const SEED_USER_EMAIL_ENV: &str = "SEED_USER_EMAIL";
pub const SEED_USER_PASSWORD_ENV: &str = "SEED_USER_PASSWORD";
pub const SEED_USER_NAME_ENV: &str = "SEED_USER_NAME";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Shortest accepted `SESSION_SECRET`, in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_EMAIL_VERIFICATION_TTL_SECS: i64 = 24 * 60 * 60;
const DEFAULT_PROTECTED_PREFIXES: &str = "/account";
const DEFAULT_REDIRECT: &str = "/signup";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_AVATAR_BASE_URL: &str = "/avatars";
const DEFAULT_SEED_USER_NAME: &str = "Admin";

/// Configuration error raised at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl fmt::Display) -> Self {
        ConfigError::Invalid {
            var,
            reason: reason.to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Session signing secret. Never printed.
#[derive(Clone)]
pub struct SessionSecret(Vec<u8>);

impl SessionSecret {
    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret([REDACTED])")
    }
}

/// Bootstrap account created at startup if its email is not taken.
#[derive(Clone)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub session_secret: SessionSecret,
    pub session_ttl: Duration,
    pub protected_prefixes: Vec<String>,
    pub unauthenticated_redirect: String,
    pub cookie_secure: bool,
    pub public_base_url: Url,
    pub avatar_base_url: String,
    pub mail_webhook_url: Option<Url>,
    pub email_verification_ttl: Duration,
    pub seed_user: Option<SeedUser>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = parse_host(get(HOST_ENV).as_deref().unwrap_or(DEFAULT_HOST))?;
        let port = match get(PORT_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid(PORT_ENV, e))?,
            None => DEFAULT_PORT,
        };
        let bind_addr = SocketAddr::new(host, port);

        let secret = get(SESSION_SECRET_ENV).ok_or(ConfigError::Missing(SESSION_SECRET_ENV))?;
        if secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::invalid(
                SESSION_SECRET_ENV,
                format!("must be at least {MIN_SECRET_BYTES} bytes"),
            ));
        }

        let protected_prefixes: Vec<String> = get(PROTECTED_PREFIXES_ENV)
            .unwrap_or_else(|| DEFAULT_PROTECTED_PREFIXES.to_string())
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if let Some(bad) = protected_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::invalid(
                PROTECTED_PREFIXES_ENV,
                format!("{bad:?} does not start with '/'"),
            ));
        }

        let unauthenticated_redirect =
            get(UNAUTHENTICATED_REDIRECT_ENV).unwrap_or_else(|| DEFAULT_REDIRECT.to_string());

        let mail_webhook_url = get(MAIL_WEBHOOK_URL_ENV)
            .map(|raw| parse_url(MAIL_WEBHOOK_URL_ENV, &raw))
            .transpose()?;

        let seed_user = match (get(SEED_USER_EMAIL_ENV), get(SEED_USER_PASSWORD_ENV)) {
            (Some(email), Some(password)) => Some(SeedUser {
                name: get(SEED_USER_NAME_ENV).unwrap_or_else(|| DEFAULT_SEED_USER_NAME.to_string()),
                email,
                password,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(SEED_USER_PASSWORD_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(SEED_USER_EMAIL_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV).map(|v| v.trim().to_ascii_lowercase()) {
            None => LogFormat::default(),
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) if v == "pretty" => LogFormat::Pretty,
            Some(v) => {
                return Err(ConfigError::invalid(
                    LOG_FORMAT_ENV,
                    format!("{v:?} is neither \"json\" nor \"pretty\""),
                ))
            }
        };

        Ok(Self {
            bind_addr,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DATA_ROOT.to_string())),
            session_secret: SessionSecret(secret.into_bytes()),
            session_ttl: seconds(SESSION_TTL_ENV, get(SESSION_TTL_ENV), DEFAULT_SESSION_TTL_SECS)?,
            protected_prefixes,
            unauthenticated_redirect,
            cookie_secure: boolean(COOKIE_SECURE_ENV, get(COOKIE_SECURE_ENV), true)?,
            public_base_url: parse_url(
                PUBLIC_BASE_URL_ENV,
                &get(PUBLIC_BASE_URL_ENV).unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
            )?,
            avatar_base_url: get(AVATAR_BASE_URL_ENV)
                .unwrap_or_else(|| DEFAULT_AVATAR_BASE_URL.to_string()),
            mail_webhook_url,
            email_verification_ttl: seconds(
                EMAIL_VERIFICATION_TTL_ENV,
                get(EMAIL_VERIFICATION_TTL_ENV),
                DEFAULT_EMAIL_VERIFICATION_TTL_SECS,
            )?,
            seed_user,
            log_format,
        })
    }

    /// Session gate settings.
    pub fn gate_config(&self) -> GateConfig {
        GateConfig::new(&self.protected_prefixes, self.unauthenticated_redirect.as_str())
    }
}

/// Bind host: an IP literal (IPv6 with or without brackets) or `localhost`.
fn parse_host(raw: &str) -> Result<IpAddr, ConfigError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    let literal = raw
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or(raw);
    literal
        .parse::<IpAddr>()
        .map_err(|e| ConfigError::invalid(HOST_ENV, e))
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::invalid(var, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(var, "scheme must be http or https"));
    }
    Ok(url)
}

fn seconds(var: &'static str, raw: Option<String>, default: i64) -> Result<Duration, ConfigError> {
    let secs = match raw {
        Some(raw) => raw.trim().parse::<i64>().map_err(|e| ConfigError::invalid(var, e))?,
        None => default,
    };
    if secs <= 0 {
        return Err(ConfigError::invalid(var, "must be a positive number of seconds"));
    }
    Duration::try_seconds(secs).ok_or_else(|| ConfigError::invalid(var, "out of range"))
}

fn boolean(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(ConfigError::invalid(var, format!("{other:?} is not a boolean"))),
    }
}
