//! Client identifiers and secrets.

use crate::error::GatewayError;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

const CLIENT_ID_BYTES: usize = 16;
const SECRET_BYTES: usize = 32;

/// Opaque, unguessable client identifier rendered in base58.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(String);

impl ClientId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; CLIENT_ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bs58::encode(bytes).into_string())
    }

    /// Parse an externally supplied id.
    ///
    /// A malformed id is reported as `NotFound`, the same as an unknown one.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotFound` if `raw` is not a base58 id of the
    /// expected length.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        match bs58::decode(raw).into_vec() {
            Ok(bytes) if bytes.len() == CLIENT_ID_BYTES => Ok(Self(raw.to_string())),
            _ => Err(GatewayError::NotFound),
        }
    }

    /// Borrow the encoded id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-client secret. Only ever shown to the operator at registration.
#[derive(Clone)]
pub struct ClientSecret(Zeroizing<String>);

impl ClientSecret {
    /// Generate a fresh random secret.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; SECRET_BYTES]);
        rand::thread_rng().fill_bytes(bytes.as_mut());
        Self(Zeroizing::new(URL_SAFE_NO_PAD.encode(bytes.as_ref())))
    }

    /// Wrap a secret presented by a caller.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// Expose the raw secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl PartialEq for ClientSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for ClientSecret {}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_and_parse() {
        let a = ClientId::generate();
        let b = ClientId::generate();

        assert_ne!(a, b);
        assert_eq!(ClientId::parse(a.as_str()).unwrap(), a);
    }

    #[test]
    fn test_malformed_id_is_not_found() {
        assert!(matches!(ClientId::parse("0OIl"), Err(GatewayError::NotFound)));
        assert!(matches!(ClientId::parse("abc"), Err(GatewayError::NotFound)));
    }

    #[test]
    fn test_secret_length_and_uniqueness() {
        let a = ClientSecret::generate();
        let b = ClientSecret::generate();

        assert_eq!(a.expose().len(), 43); // Base64 encoded 32 bytes
        assert_ne!(a, b);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = ClientSecret::new("hunter2");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }
}
