//! Algorithm identifiers for signing and nested encryption.

use crate::error::GatewayError;
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::fmt;

/// JWS signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256
    HS256,
    /// HMAC with SHA-384
    HS384,
    /// HMAC with SHA-512
    HS512,
    /// RSA PKCS#1 v1.5 with SHA-256
    RS256,
    /// RSA PKCS#1 v1.5 with SHA-384
    RS384,
    /// RSA PKCS#1 v1.5 with SHA-512
    RS512,
    /// RSA-PSS with SHA-256
    PS256,
    /// RSA-PSS with SHA-384
    PS384,
    /// RSA-PSS with SHA-512
    PS512,
    /// ECDSA with P-256 and SHA-256
    ES256,
    /// ECDSA with P-384 and SHA-384
    ES384,
    /// Ed25519
    EdDSA,
}

impl SigningAlgorithm {
    /// Parse algorithm from its JOSE name.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown names.
    pub fn parse(s: &str) -> Result<Self, GatewayError> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "PS256" => Ok(Self::PS256),
            "PS384" => Ok(Self::PS384),
            "PS512" => Ok(Self::PS512),
            "ES256" => Ok(Self::ES256),
            "ES384" => Ok(Self::ES384),
            "EdDSA" => Ok(Self::EdDSA),
            _ => Err(GatewayError::validation(format!(
                "unsupported signing algorithm '{s}'"
            ))),
        }
    }

    /// JOSE name for the `alg` header.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::EdDSA => "EdDSA",
        }
    }

    /// Algorithm understood by `jsonwebtoken`.
    #[must_use]
    pub const fn to_jwt(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::RS512 => Algorithm::RS512,
            Self::PS256 => Algorithm::PS256,
            Self::PS384 => Algorithm::PS384,
            Self::PS512 => Algorithm::PS512,
            Self::ES256 => Algorithm::ES256,
            Self::ES384 => Algorithm::ES384,
            Self::EdDSA => Algorithm::EdDSA,
        }
    }

    /// Minimum HMAC key length in bytes, `None` for asymmetric algorithms.
    #[must_use]
    pub const fn min_secret_len(&self) -> Option<usize> {
        match self {
            Self::HS256 => Some(32),
            Self::HS384 => Some(48),
            Self::HS512 => Some(64),
            _ => None,
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWE key-management algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyManagement {
    /// The configured key is the content encryption key.
    #[serde(rename = "dir")]
    Direct,
    /// AES-GCM key wrap with a 128-bit key
    #[serde(rename = "A128GCMKW")]
    A128GcmKw,
    /// AES-GCM key wrap with a 256-bit key
    #[serde(rename = "A256GCMKW")]
    A256GcmKw,
}

impl KeyManagement {
    /// JOSE name for the `alg` header.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "dir",
            Self::A128GcmKw => "A128GCMKW",
            Self::A256GcmKw => "A256GCMKW",
        }
    }

    /// Required length of the configured key in bytes.
    #[must_use]
    pub const fn key_len(&self, enc: ContentEncryption) -> usize {
        match self {
            Self::Direct => enc.key_len(),
            Self::A128GcmKw => 16,
            Self::A256GcmKw => 32,
        }
    }
}

/// JWE content-encryption algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentEncryption {
    /// AES-GCM with a 128-bit key
    #[serde(rename = "A128GCM")]
    A128Gcm,
    /// AES-GCM with a 256-bit key
    #[serde(rename = "A256GCM")]
    A256Gcm,
}

impl ContentEncryption {
    /// JOSE name for the `enc` header.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::A128Gcm => "A128GCM",
            Self::A256Gcm => "A256GCM",
        }
    }

    /// Content encryption key length in bytes.
    #[must_use]
    pub const fn key_len(&self) -> usize {
        match self {
            Self::A128Gcm => 16,
            Self::A256Gcm => 32,
        }
    }
}
