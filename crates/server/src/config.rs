//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `ROLODEX_DATABASE_URL` - SQLite connection string
//!   (default: `sqlite://rolodex.db?mode=rwc`)
//! - `ROLODEX_HOST` - Bind address (default: 127.0.0.1)
//! - `ROLODEX_PORT` - Listen port (default: 3000)
//! - `ROLODEX_SECURE_COOKIES` - Set `true` when serving behind TLS so the
//!   session cookie carries the Secure attribute (default: false)
//! - `ROLODEX_LOG_JSON` - Set `true` for JSON-formatted logs (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Sentry tracing sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://rolodex.db?mode=rwc";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SQLite database connection URL.
    pub database_url: SecretString,
    /// Bind address.
    pub host: IpAddr,
    /// Listen port.
    pub port: u16,
    /// Whether the session cookie is marked Secure.
    pub secure_cookies: bool,
    /// Emit JSON-formatted logs.
    pub log_json: bool,
    /// Sentry DSN (error tracking disabled when absent).
    pub sentry_dsn: Option<String>,
    /// Sentry environment name.
    pub sentry_environment: Option<String>,
    /// Sentry event sample rate.
    pub sentry_sample_rate: f32,
    /// Sentry tracing sample rate.
    pub sentry_traces_sample_rate: f32,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through a variable lookup function.
    ///
    /// Extracted from [`Self::from_env`] so tests can supply variables
    /// without mutating the process environment.
    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get("ROLODEX_DATABASE_URL")
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned())
            .into();

        let host = match get("ROLODEX_HOST") {
            Some(raw) => raw.parse::<IpAddr>().map_err(|e| {
                ConfigError::InvalidEnvVar("ROLODEX_HOST".to_owned(), e.to_string())
            })?,
            None => DEFAULT_HOST.parse().map_err(
                |e: std::net::AddrParseError| {
                    ConfigError::InvalidEnvVar("ROLODEX_HOST".to_owned(), e.to_string())
                },
            )?,
        };

        let port = match get("ROLODEX_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| {
                ConfigError::InvalidEnvVar("ROLODEX_PORT".to_owned(), e.to_string())
            })?,
            None => DEFAULT_PORT,
        };

        let secure_cookies = parse_bool(&get, "ROLODEX_SECURE_COOKIES")?;
        let log_json = parse_bool(&get, "ROLODEX_LOG_JSON")?;

        let sentry_sample_rate = parse_rate(&get, "SENTRY_SAMPLE_RATE", 1.0)?;
        let sentry_traces_sample_rate = parse_rate(&get, "SENTRY_TRACES_SAMPLE_RATE", 0.0)?;

        Ok(Self {
            database_url,
            host,
            port,
            secure_cookies,
            log_json,
            sentry_dsn: get("SENTRY_DSN"),
            sentry_environment: get("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// The socket address to bind.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_bool(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<bool, ConfigError> {
    match get(name) {
        None => Ok(false),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" | "" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar(
                name.to_owned(),
                format!("expected a boolean, got {other:?}"),
            )),
        },
    }
}

fn parse_rate(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: f32,
) -> Result<f32, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(raw) => {
            let rate = raw.parse::<f32>().map_err(|e| {
                ConfigError::InvalidEnvVar(name.to_owned(), e.to_string())
            })?;
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::InvalidEnvVar(
                    name.to_owned(),
                    format!("sample rate must be within 0.0..=1.0, got {rate}"),
                ));
            }
            Ok(rate)
        }
    }
}
