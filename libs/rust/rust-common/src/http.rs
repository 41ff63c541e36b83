//! Outbound client for JSON claim endpoints.
//!
//! Endpoint URLs and extra headers come from client registrations, not from
//! operators. The client built here therefore never follows redirects, always
//! asks for JSON, and only accepts extra headers that leave request framing
//! alone.

use crate::PlatformError;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Headers a registration may not set. They are owned by the transport.
pub const RESERVED_HEADERS: &[&str] = &[
    "host",
    "content-type",
    "content-length",
    "transfer-encoding",
    "connection",
    "accept",
];

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Claim endpoint client settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request deadline, used when a registration sets none
    pub timeout: Duration,
    /// TCP and TLS handshake deadline, never longer than `timeout`
    pub connect_timeout: Duration,
    /// User agent sent on every call
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl HttpConfig {
    /// Settings for a request deadline. The connect deadline is capped at 5s.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout: timeout.min(MAX_CONNECT_TIMEOUT),
            user_agent: concat!("sso-gateway/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Override the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Build the claim endpoint client.
///
/// # Errors
///
/// Returns `PlatformError::Http` if the client cannot be built (e.g. TLS
/// initialization fails).
pub fn build_http_client(config: &HttpConfig) -> Result<Client, PlatformError> {
    let mut defaults = HeaderMap::new();
    defaults.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Ok(ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .default_headers(defaults)
        .redirect(Policy::none())
        .use_rustls_tls()
        .build()?)
}

/// Turn registration-supplied headers into a header map.
///
/// # Errors
///
/// Returns `PlatformError::InvalidInput` naming the first header that is
/// reserved, has an invalid name, or has a value that cannot be sent.
pub fn extra_headers<'a, I>(headers: I) -> Result<HeaderMap, PlatformError>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| PlatformError::invalid_input(format!("invalid header name '{name}'")))?;
        if RESERVED_HEADERS.contains(&header.as_str()) {
            return Err(PlatformError::invalid_input(format!(
                "header '{name}' is reserved"
            )));
        }
        let value = HeaderValue::from_str(value)
            .map_err(|_| PlatformError::invalid_input(format!("invalid value for header '{name}'")))?;
        map.insert(header, value);
    }
    Ok(map)
}
