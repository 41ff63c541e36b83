//! Centralized configuration for the SSO gateway.
//!
//! All configuration is loaded from environment variables and validated
//! at startup.

use crate::error::GatewayError;
use rust_common::{HttpConfig, TracingConfig};
use std::env;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 86_400;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    // Storage
    /// Redis URL; the in-memory backend is used when unset
    pub redis_url: Option<String>,

    // Token settings
    /// Global `iss` claim, if any
    pub token_issuer: Option<String>,

    // Outbound fetch
    /// Default timeout for payload fetch calls
    pub fetch_timeout: Duration,

    // Lifecycle
    /// Inactivity after which a client becomes a sweep candidate
    pub client_retention: Duration,

    // Logging
    /// Log level filter
    pub log_level: String,
    /// Emit JSON logs
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_var(&lookup, "PORT", 8080)?;

        let redis_url = lookup("REDIS_URL").filter(|v| !v.is_empty());
        let token_issuer = lookup("TOKEN_ISSUER").filter(|v| !v.is_empty());

        let fetch_timeout = Duration::from_secs(parse_var(&lookup, "FETCH_TIMEOUT", 10)?);
        let retention_days: u64 = parse_var(&lookup, "CLIENT_RETENTION_DAYS", 90)?;
        if retention_days == 0 {
            return Err(GatewayError::configuration(
                "CLIENT_RETENTION_DAYS must be at least 1",
            ));
        }
        let retention_secs = retention_days.checked_mul(SECONDS_PER_DAY).ok_or_else(|| {
            GatewayError::configuration("CLIENT_RETENTION_DAYS is out of range")
        })?;
        let client_retention = Duration::from_secs(retention_secs);

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_json = parse_var(&lookup, "LOG_JSON", false)?;

        Ok(Self {
            host,
            port,
            redis_url,
            token_issuer,
            fetch_timeout,
            client_retention,
            log_level,
            log_json,
        })
    }

    /// Tracing settings derived from this configuration.
    #[must_use]
    pub fn tracing(&self) -> TracingConfig {
        TracingConfig::new("sso-gateway", self.log_level.clone()).json(self.log_json)
    }

    /// HTTP client settings for payload fetchers.
    #[must_use]
    pub fn http(&self) -> HttpConfig {
        HttpConfig::new(self.fetch_timeout)
    }
}

/// Parse a variable with a default value.
fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> Result<T, GatewayError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(val) => val
            .parse()
            .map_err(|e| GatewayError::configuration(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}
