//! Application configuration loaded from environment variables.

use std::time::Duration;

use thiserror::Error;

/// Configuration errors detected at start-up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {name} value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("PAYMENT_URL is set but PAYMENT_API_KEY is missing")]
    MissingPaymentKey,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables (after loading an optional `.env`):
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `DATABASE_URL` — PostgreSQL URL; orders are kept in memory when unset
/// - `DB_MAX_CONNECTIONS` — pool size (default: `5`)
/// - `CATALOG_URL` — catalog service base URL; a seeded in-memory catalog when unset
/// - `PAYMENT_URL`, `PAYMENT_API_KEY` — payment processor; simulated when unset
/// - `PAYMENT_CURRENCY` — three-letter code (default: `usd`)
/// - `REQUEST_TIMEOUT_MS` — default per-request deadline (default: `10000`)
/// - `MAX_REQUEST_TIMEOUT_MS` — upper bound for caller-supplied deadlines (default: `30000`)
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub catalog_url: Option<String>,
    pub payment_url: Option<String>,
    pub payment_api_key: Option<String>,
    pub payment_currency: String,
    pub request_timeout: Duration,
    pub max_request_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("catalog_url", &self.catalog_url)
            .field("payment_url", &self.payment_url)
            .field("payment_api_key", &self.payment_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("payment_currency", &self.payment_currency)
            .field("request_timeout", &self.request_timeout)
            .field("max_request_timeout", &self.max_request_timeout)
            .finish()
    }
}

fn parse<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}

impl Config {
    /// Loads configuration from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let log_format = match var("LOG_FORMAT").map(|v| v.to_ascii_lowercase()).as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.to_string(),
                });
            }
        };

        let payment_currency = var("PAYMENT_CURRENCY")
            .map(|c| c.trim().to_ascii_lowercase())
            .unwrap_or(defaults.payment_currency);
        if payment_currency.len() != 3 || !payment_currency.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(ConfigError::Invalid {
                name: "PAYMENT_CURRENCY",
                value: payment_currency,
            });
        }

        let payment_url = var("PAYMENT_URL");
        let payment_api_key = var("PAYMENT_API_KEY");
        if payment_url.is_some() && payment_api_key.is_none() {
            return Err(ConfigError::MissingPaymentKey);
        }

        let request_timeout_ms = parse("REQUEST_TIMEOUT_MS", var("REQUEST_TIMEOUT_MS"), 10_000u64)?;
        let max_request_timeout_ms = parse(
            "MAX_REQUEST_TIMEOUT_MS",
            var("MAX_REQUEST_TIMEOUT_MS"),
            30_000u64,
        )?;

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse("PORT", var("PORT"), defaults.port)?,
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: var("DATABASE_URL"),
            db_max_connections: parse(
                "DB_MAX_CONNECTIONS",
                var("DB_MAX_CONNECTIONS"),
                defaults.db_max_connections,
            )?,
            catalog_url: var("CATALOG_URL"),
            payment_url,
            payment_api_key,
            payment_currency,
            request_timeout: Duration::from_millis(request_timeout_ms),
            // The default deadline never exceeds the cap
            max_request_timeout: Duration::from_millis(max_request_timeout_ms.max(request_timeout_ms)),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            db_max_connections: 5,
            catalog_url: None,
            payment_url: None,
            payment_api_key: None,
            payment_currency: "usd".to_string(),
            request_timeout: Duration::from_millis(10_000),
            max_request_timeout: Duration::from_millis(30_000),
        }
    }
}
