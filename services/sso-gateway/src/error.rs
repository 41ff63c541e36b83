//! Gateway error taxonomy.
//!
//! Validation errors carry a message that is safe to hand back to the caller.
//! Everything else collapses to a generic message at the HTTP boundary while
//! the full detail goes to the log.

use rust_common::PlatformError;
use thiserror::Error;

/// Errors raised by the gateway core.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Bad or incomplete registration input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unknown client id or wrong secret. The two are never distinguished.
    #[error("Not found")]
    NotFound,

    /// Authenticated decryption failed.
    #[error("Integrity check failed")]
    Integrity,

    /// Ambiguous or missing registry entry, unmatched fetcher, bad settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Outbound fetch call failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Compensation after a failed registration left keys behind.
    #[error("Partial failure for client {client_id}: {orphaned} orphaned key(s)")]
    PartialFailure {
        /// Client whose keys were left behind
        client_id: String,
        /// Number of keys that could not be cleaned up
        orphaned: usize,
    },

    /// Key-value backend failure.
    #[error("Storage error: {0}")]
    Storage(#[from] PlatformError),

    /// Token signing or encryption failure.
    #[error("Token error: {0}")]
    Token(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a token error.
    #[must_use]
    pub fn token(msg: impl Into<String>) -> Self {
        Self::Token(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller caused this error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound | Self::Integrity)
    }

    /// Message safe to return to an external caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            // Integrity failures look exactly like a miss from the outside.
            Self::NotFound | Self::Integrity => "not found".to_string(),
            _ => "service unavailable".to_string(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for GatewayError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Token(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization failed: {err}"))
    }
}
