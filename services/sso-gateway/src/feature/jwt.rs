//! JWT tokenizer feature config.

use super::FeatureConfig;
use crate::jwt::algorithm::{ContentEncryption, KeyManagement, SigningAlgorithm};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signing key material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum KeyMaterial {
    /// Shared HMAC secret (raw bytes of the string)
    Secret(String),
    /// Base64url PKCS#8 DER private key (EC and Ed25519)
    Pkcs8(String),
    /// PEM encoded private key (RSA)
    Pem(String),
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Secret(_) => "Secret",
            Self::Pkcs8(_) => "Pkcs8",
            Self::Pem(_) => "Pem",
        };
        write!(f, "KeyMaterial::{kind}(<redacted>)")
    }
}

/// `aud` claim value: a single audience or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// Single audience string
    One(String),
    /// Audience list
    Many(Vec<String>),
}

/// Nested encryption settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Key-management algorithm
    pub alg: KeyManagement,
    /// Content-encryption algorithm
    pub enc: ContentEncryption,
    /// Base64url key material
    pub key: String,
    /// Compress the signed token with DEFLATE before encryption
    #[serde(default)]
    pub zip: bool,
}

impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("alg", &self.alg)
            .field("enc", &self.enc)
            .field("key", &"<redacted>")
            .field("zip", &self.zip)
            .finish()
    }
}

/// Configuration for issuing signed (and optionally encrypted) JWTs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtTokenizerConfig {
    /// Signing algorithm
    pub algorithm: SigningAlgorithm,
    /// Signing key
    pub key: KeyMaterial,
    /// `kid` header value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    /// Lifetime in seconds added to `iat` for `exp`. Zero expires at issuance.
    #[serde(default)]
    pub ttl: i64,
    /// `aud` claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<Audience>,
    /// Session attributes copied into the payload; `name[]` keeps all values
    #[serde(default)]
    pub claims: Vec<String>,
    /// Nested encryption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionConfig>,
}

impl JwtTokenizerConfig {
    /// Registration key.
    pub const FEATURE: &'static str = "jwt";
}

impl FeatureConfig for JwtTokenizerConfig {
    fn feature(&self) -> &'static str {
        Self::FEATURE
    }

    fn claim_names(&self) -> &[String] {
        &self.claims
    }
}
