//! Authenticated encryption of stored configs under a client secret.
//!
//! Blob layout: `version (1) || salt (16) || nonce (12) || ciphertext || tag (16)`.
//! The AES-256-GCM key is derived per blob with HKDF-SHA256 over the secret
//! and the random salt. Callers bind the blob to its storage location through
//! the associated data.

use crate::client::ClientSecret;
use crate::error::GatewayError;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use once_cell::sync::Lazy;
use rand::RngCore;
use ring::hkdf;
use zeroize::Zeroizing;

const VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 1 + SALT_LEN + NONCE_LEN;
const KEY_LEN: usize = 32;
const KDF_INFO: &[u8] = b"sso-gateway/feature-config/v1";

/// Blob encrypted under a throwaway secret, used to spend the same work on a
/// miss as on a wrong-secret hit.
static DECOY: Lazy<Vec<u8>> = Lazy::new(|| {
    let throwaway = ClientSecret::generate();
    SecretCipher::encrypt(&[0u8; 256], &throwaway, b"decoy").unwrap_or_default()
});

struct KeyLen(usize);

impl hkdf::KeyType for KeyLen {
    fn len(&self) -> usize {
        self.0
    }
}

/// Secret-keyed authenticated encryption.
pub struct SecretCipher;

impl SecretCipher {
    /// Encrypt `plaintext` under `secret`, authenticating `aad`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if key derivation or encryption fails.
    pub fn encrypt(
        plaintext: &[u8],
        secret: &ClientSecret,
        aad: &[u8],
    ) -> Result<Vec<u8>, GatewayError> {
        let mut rng = rand::thread_rng();
        let mut salt = [0u8; SALT_LEN];
        rng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce);

        let key = derive_key(secret, &salt)
            .ok_or_else(|| GatewayError::internal("key derivation failed"))?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| GatewayError::internal(format!("cipher init failed: {e}")))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
            .map_err(|e| GatewayError::internal(format!("encryption failed: {e}")))?;

        let mut blob = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        blob.push(VERSION);
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&nonce);
        blob.extend(ciphertext);
        Ok(blob)
    }

    /// Decrypt a blob produced by [`SecretCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Integrity` for a wrong secret, mismatched
    /// associated data, tampering or a malformed blob.
    pub fn decrypt(blob: &[u8], secret: &ClientSecret, aad: &[u8]) -> Result<Vec<u8>, GatewayError> {
        if blob.len() < HEADER_LEN + TAG_LEN || blob[0] != VERSION {
            return Err(GatewayError::Integrity);
        }
        let (salt, rest) = blob[1..].split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let key = derive_key(secret, salt).ok_or(GatewayError::Integrity)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref()).map_err(|_| GatewayError::Integrity)?;
        cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad })
            .map_err(|_| GatewayError::Integrity)
    }

    /// Run a decryption that is bound to fail, costing the same as a real one.
    pub fn decoy(secret: &ClientSecret, aad: &[u8]) {
        let _ = Self::decrypt(&DECOY, secret, aad);
    }
}

fn derive_key(secret: &ClientSecret, salt: &[u8]) -> Option<Zeroizing<[u8; KEY_LEN]>> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, salt).extract(secret.expose().as_bytes());
    let okm = prk.expand(&[KDF_INFO], KeyLen(KEY_LEN)).ok()?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    okm.fill(key.as_mut()).ok()?;
    Some(key)
}
