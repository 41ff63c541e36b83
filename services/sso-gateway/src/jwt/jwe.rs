//! Compact JWE wrapping for nested (signed then encrypted) tokens.
//!
//! Supports `dir`, `A128GCMKW` and `A256GCMKW` key management with `A128GCM`
//! or `A256GCM` content encryption, and optional `DEF` compression. The
//! primitives come from `aes-gcm` and `flate2`; this module only lays out the
//! RFC 7516 compact serialization around them.

use crate::error::GatewayError;
use crate::feature::EncryptionConfig;
use crate::jwt::algorithm::{ContentEncryption, KeyManagement};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use zeroize::Zeroizing;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Serialize, Deserialize)]
struct JweHeader {
    alg: KeyManagement,
    enc: ContentEncryption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
}

/// Encrypt `plaintext` (a signed JWT) into a compact JWE.
///
/// # Errors
///
/// Returns a token error if the configured key is malformed or encryption
/// fails.
pub fn encrypt_compact(plaintext: &[u8], config: &EncryptionConfig) -> Result<String, GatewayError> {
    let key = decode_key(&config.key, config.alg.key_len(config.enc))?;

    let (cek, encrypted_key, iv, tag) = match config.alg {
        KeyManagement::Direct => (key, Vec::new(), None, None),
        KeyManagement::A128GcmKw | KeyManagement::A256GcmKw => {
            let cek = Zeroizing::new(random_bytes(config.enc.key_len()));
            let wrap_iv = random_bytes(IV_LEN);
            let (wrapped, wrap_tag) = seal(&key, &wrap_iv, &cek, b"")?;
            (
                cek,
                wrapped,
                Some(URL_SAFE_NO_PAD.encode(wrap_iv)),
                Some(URL_SAFE_NO_PAD.encode(wrap_tag)),
            )
        }
    };

    let header = JweHeader {
        alg: config.alg,
        enc: config.enc,
        zip: config.zip.then(|| "DEF".to_string()),
        cty: Some("JWT".to_string()),
        iv,
        tag,
    };
    let protected = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);

    let body = if config.zip {
        deflate(plaintext)?
    } else {
        plaintext.to_vec()
    };
    let content_iv = random_bytes(IV_LEN);
    let (ciphertext, content_tag) = seal(&cek, &content_iv, &body, protected.as_bytes())?;

    Ok([
        protected,
        URL_SAFE_NO_PAD.encode(encrypted_key),
        URL_SAFE_NO_PAD.encode(content_iv),
        URL_SAFE_NO_PAD.encode(ciphertext),
        URL_SAFE_NO_PAD.encode(content_tag),
    ]
    .join("."))
}

/// Decrypt a compact JWE produced by [`encrypt_compact`], returning the inner
/// token.
///
/// # Errors
///
/// Returns a token error for malformed input, a wrong key or tampering.
pub fn decrypt_compact(token: &str, key: &[u8]) -> Result<String, GatewayError> {
    let parts: Vec<&str> = token.split('.').collect();
    let [protected, encrypted_key, iv, ciphertext, tag] = parts.as_slice() else {
        return Err(GatewayError::token("JWE must have five parts"));
    };

    let header: JweHeader = serde_json::from_slice(&b64(protected)?)
        .map_err(|e| GatewayError::token(format!("invalid JWE header: {e}")))?;
    if key.len() != header.alg.key_len(header.enc) {
        return Err(GatewayError::token("JWE key has the wrong length"));
    }

    let cek = match header.alg {
        KeyManagement::Direct => Zeroizing::new(key.to_vec()),
        KeyManagement::A128GcmKw | KeyManagement::A256GcmKw => {
            let wrap_iv = b64(header.iv.as_deref().unwrap_or_default())?;
            let wrap_tag = b64(header.tag.as_deref().unwrap_or_default())?;
            Zeroizing::new(open(key, &wrap_iv, &b64(encrypted_key)?, &wrap_tag, b"")?)
        }
    };
    if cek.len() != header.enc.key_len() {
        return Err(GatewayError::token("JWE content key has the wrong length"));
    }

    let body = open(&cek, &b64(iv)?, &b64(ciphertext)?, &b64(tag)?, protected.as_bytes())?;
    let plaintext = match header.zip.as_deref() {
        None => body,
        Some("DEF") => inflate(&body)?,
        Some(other) => {
            return Err(GatewayError::token(format!("unsupported zip '{other}'")));
        }
    };

    String::from_utf8(plaintext).map_err(|_| GatewayError::token("JWE payload is not UTF-8"))
}

fn decode_key(encoded: &str, expected: usize) -> Result<Zeroizing<Vec<u8>>, GatewayError> {
    let key = Zeroizing::new(
        URL_SAFE_NO_PAD
            .decode(encoded.as_bytes())
            .map_err(|_| GatewayError::token("encryption key is not base64url"))?,
    );
    if key.len() != expected {
        return Err(GatewayError::token(format!(
            "encryption key must be {expected} bytes"
        )));
    }
    Ok(key)
}

fn b64(part: &str) -> Result<Vec<u8>, GatewayError> {
    URL_SAFE_NO_PAD
        .decode(part.as_bytes())
        .map_err(|_| GatewayError::token("JWE part is not base64url"))
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// AES-GCM encrypt, returning ciphertext and tag separately.
fn seal(key: &[u8], iv: &[u8], msg: &[u8], aad: &[u8]) -> Result<(Vec<u8>, Vec<u8>), GatewayError> {
    let payload = Payload { msg, aad };
    let nonce = Nonce::from_slice(iv);
    let mut sealed = match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|e| GatewayError::token(e.to_string()))?
            .encrypt(nonce, payload),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|e| GatewayError::token(e.to_string()))?
            .encrypt(nonce, payload),
        n => return Err(GatewayError::token(format!("unsupported AES key size {n}"))),
    }
    .map_err(|_| GatewayError::token("AES-GCM encryption failed"))?;

    let tag = sealed.split_off(sealed.len() - TAG_LEN);
    Ok((sealed, tag))
}

fn open(key: &[u8], iv: &[u8], ciphertext: &[u8], tag: &[u8], aad: &[u8]) -> Result<Vec<u8>, GatewayError> {
    if iv.len() != IV_LEN || tag.len() != TAG_LEN {
        return Err(GatewayError::token("malformed JWE iv or tag"));
    }
    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    let payload = Payload { msg: &sealed, aad };
    let nonce = Nonce::from_slice(iv);
    let opened = match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|e| GatewayError::token(e.to_string()))?
            .decrypt(nonce, payload),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|e| GatewayError::token(e.to_string()))?
            .decrypt(nonce, payload),
        n => return Err(GatewayError::token(format!("unsupported AES key size {n}"))),
    };
    opened.map_err(|_| GatewayError::token("JWE decryption failed"))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, GatewayError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| GatewayError::token(format!("compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| GatewayError::token(format!("compression failed: {e}")))
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, GatewayError> {
    let mut out = Vec::new();
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| GatewayError::token(format!("decompression failed: {e}")))?;
    Ok(out)
}
