//! Factories for the `jwt` feature, one per signing algorithm family.
//!
//! All of them accept the same common fields:
//!
//! ```json
//! { "#": "ES256", "kid": "k1", "ttl": 600, "audience": "app",
//!   "claims": ["email", "roles[]"],
//!   "encryption": { "alg": "A256GCMKW", "enc": "A256GCM", "zip": "DEF" } }
//! ```
//!
//! Key material the caller did not supply is generated and echoed back once in
//! the side output.

use super::{BuiltConfig, ConfigFactory, parse_input};
use crate::error::GatewayError;
use crate::feature::{Audience, EncryptionConfig, JwtTokenizerConfig, KeyMaterial};
use crate::jwt::algorithm::{ContentEncryption, KeyManagement, SigningAlgorithm};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::EncodingKey;
use rand::RngCore;
use ring::rand::SystemRandom;
use ring::signature::{self, EcdsaKeyPair, Ed25519KeyPair, KeyPair};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use std::any::TypeId;
use std::sync::Arc;

const KEY: &str = JwtTokenizerConfig::FEATURE;

#[derive(Debug, Deserialize)]
struct CommonInput {
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    ttl: Option<i64>,
    #[serde(default)]
    audience: Option<Audience>,
    #[serde(default)]
    claims: Vec<String>,
    #[serde(default)]
    encryption: Option<EncryptionInput>,
}

#[derive(Debug, Deserialize)]
struct EncryptionInput {
    alg: KeyManagement,
    enc: ContentEncryption,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    zip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HmacInput {
    #[serde(default)]
    secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RsaInput {
    #[serde(rename = "privateKey")]
    private_key: Option<String>,
}

/// Everything but the signing key, plus whatever must be echoed back.
struct Common {
    key_id: Option<String>,
    ttl: i64,
    audience: Option<Audience>,
    claims: Vec<String>,
    encryption: Option<EncryptionConfig>,
    side_output: Map<String, Value>,
}

impl Common {
    fn parse(input: &Map<String, Value>) -> Result<Self, GatewayError> {
        let raw: CommonInput = parse_input(KEY, input)?;

        let ttl = raw.ttl.unwrap_or(0);
        if ttl < 0 {
            return Err(GatewayError::validation(format!("{KEY}: ttl must not be negative")));
        }
        if raw.claims.iter().any(|c| c.trim_end_matches("[]").is_empty()) {
            return Err(GatewayError::validation(format!("{KEY}: empty claim name")));
        }

        let mut side_output = Map::new();
        let encryption = raw
            .encryption
            .map(|enc| encryption_config(enc, &mut side_output))
            .transpose()?;

        Ok(Self {
            key_id: raw.kid,
            ttl,
            audience: raw.audience,
            claims: raw.claims,
            encryption,
            side_output,
        })
    }

    fn finish(self, algorithm: SigningAlgorithm, key: KeyMaterial) -> BuiltConfig {
        let side_output = (!self.side_output.is_empty()).then(|| Value::Object(self.side_output));
        BuiltConfig {
            config: Box::new(JwtTokenizerConfig {
                algorithm,
                key,
                key_id: self.key_id,
                ttl: self.ttl,
                audience: self.audience,
                claims: self.claims,
                encryption: self.encryption,
            }),
            side_output,
        }
    }
}

fn encryption_config(
    input: EncryptionInput,
    side_output: &mut Map<String, Value>,
) -> Result<EncryptionConfig, GatewayError> {
    let zip = match input.zip.as_deref() {
        None => false,
        Some("DEF") => true,
        Some(other) => {
            return Err(GatewayError::validation(format!(
                "{KEY}: unsupported compression '{other}'"
            )));
        }
    };

    let expected = input.alg.key_len(input.enc);
    let key = match input.key {
        Some(key) => {
            let bytes = URL_SAFE_NO_PAD.decode(key.as_bytes()).map_err(|_| {
                GatewayError::validation(format!("{KEY}: encryption key must be base64url"))
            })?;
            if bytes.len() != expected {
                return Err(GatewayError::validation(format!(
                    "{KEY}: {} needs a {expected}-byte encryption key",
                    input.alg.as_str()
                )));
            }
            key
        }
        None => {
            let key = URL_SAFE_NO_PAD.encode(random_bytes(expected));
            side_output.insert("encryption".to_string(), json!({ "key": key }));
            key
        }
    };

    Ok(EncryptionConfig {
        alg: input.alg,
        enc: input.enc,
        key,
        zip,
    })
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// RFC 7638 thumbprint over the required members of a public JWK.
fn thumbprint(jwk: &Value) -> String {
    let canonical = match jwk["kty"].as_str() {
        Some("EC") => json!({"crv": jwk["crv"], "kty": "EC", "x": jwk["x"], "y": jwk["y"]}),
        _ => json!({"crv": jwk["crv"], "kty": jwk["kty"], "x": jwk["x"]}),
    };
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.to_string().as_bytes()))
}

/// Attach a generated public JWK to the side output, defaulting `kid` to its
/// thumbprint.
fn publish_jwk(common: &mut Common, algorithm: SigningAlgorithm, mut jwk: Map<String, Value>) {
    let kid = common
        .key_id
        .get_or_insert_with(|| thumbprint(&Value::Object(jwk.clone())))
        .clone();
    jwk.insert("alg".to_string(), json!(algorithm.as_str()));
    jwk.insert("use".to_string(), json!("sig"));
    jwk.insert("kid".to_string(), json!(kid));
    common.side_output.insert("jwk".to_string(), Value::Object(jwk));
}

/// HMAC factory. Uses the supplied `secret` or generates one.
#[derive(Debug, Clone)]
pub struct HmacFactory {
    algorithm: SigningAlgorithm,
    selector: &'static str,
}

impl HmacFactory {
    /// Factory selected by the algorithm's own name. Non-HMAC algorithms
    /// fall back to HS256.
    #[must_use]
    pub const fn new(algorithm: SigningAlgorithm) -> Self {
        let algorithm = match algorithm {
            SigningAlgorithm::HS384 | SigningAlgorithm::HS512 => algorithm,
            _ => SigningAlgorithm::HS256,
        };
        Self {
            algorithm,
            selector: algorithm.as_str(),
        }
    }

    /// HS256 factory answering the bare `jwt` key.
    #[must_use]
    pub const fn default_selector() -> Self {
        Self {
            algorithm: SigningAlgorithm::HS256,
            selector: KEY,
        }
    }
}

impl ConfigFactory for HmacFactory {
    fn config_kind(&self) -> TypeId {
        TypeId::of::<JwtTokenizerConfig>()
    }

    fn key(&self) -> &'static str {
        KEY
    }

    fn selector(&self) -> &str {
        self.selector
    }

    fn build(&self, input: &Map<String, Value>) -> Result<BuiltConfig, GatewayError> {
        let mut common = Common::parse(input)?;
        let raw: HmacInput = parse_input(KEY, input)?;
        let min_len = self.algorithm.min_secret_len().unwrap_or(32);

        let secret = match raw.secret {
            Some(secret) if secret.len() < min_len => {
                return Err(GatewayError::validation(format!(
                    "{KEY}: {} secret must be at least {min_len} bytes",
                    self.algorithm
                )));
            }
            Some(secret) => secret,
            None => {
                let secret = URL_SAFE_NO_PAD.encode(random_bytes(min_len));
                common.side_output.insert("secret".to_string(), json!(secret));
                secret
            }
        };

        Ok(common.finish(self.algorithm, KeyMaterial::Secret(secret)))
    }
}

/// ECDSA factory. Generates a key pair and echoes the public JWK.
#[derive(Debug, Clone, Copy)]
pub struct EcdsaFactory {
    algorithm: SigningAlgorithm,
}

impl EcdsaFactory {
    /// P-256 / SHA-256.
    #[must_use]
    pub const fn es256() -> Self {
        Self {
            algorithm: SigningAlgorithm::ES256,
        }
    }

    /// P-384 / SHA-384.
    #[must_use]
    pub const fn es384() -> Self {
        Self {
            algorithm: SigningAlgorithm::ES384,
        }
    }

    fn curve(self) -> (&'static signature::EcdsaSigningAlgorithm, &'static str) {
        match self.algorithm {
            SigningAlgorithm::ES384 => (&signature::ECDSA_P384_SHA384_FIXED_SIGNING, "P-384"),
            _ => (&signature::ECDSA_P256_SHA256_FIXED_SIGNING, "P-256"),
        }
    }
}

impl ConfigFactory for EcdsaFactory {
    fn config_kind(&self) -> TypeId {
        TypeId::of::<JwtTokenizerConfig>()
    }

    fn key(&self) -> &'static str {
        KEY
    }

    fn selector(&self) -> &str {
        self.algorithm.as_str()
    }

    fn build(&self, input: &Map<String, Value>) -> Result<BuiltConfig, GatewayError> {
        let mut common = Common::parse(input)?;
        let (curve, crv) = self.curve();
        let rng = SystemRandom::new();

        let pkcs8 = EcdsaKeyPair::generate_pkcs8(curve, &rng)
            .map_err(|_| GatewayError::internal("EC key generation failed"))?;
        let pair = EcdsaKeyPair::from_pkcs8(curve, pkcs8.as_ref(), &rng)
            .map_err(|e| GatewayError::internal(format!("generated EC key rejected: {e}")))?;

        // Uncompressed point: 0x04 || x || y
        let point = pair.public_key().as_ref();
        let (x, y) = point[1..].split_at((point.len() - 1) / 2);
        let mut jwk = Map::new();
        jwk.insert("kty".to_string(), json!("EC"));
        jwk.insert("crv".to_string(), json!(crv));
        jwk.insert("x".to_string(), json!(URL_SAFE_NO_PAD.encode(x)));
        jwk.insert("y".to_string(), json!(URL_SAFE_NO_PAD.encode(y)));
        publish_jwk(&mut common, self.algorithm, jwk);

        let key = KeyMaterial::Pkcs8(URL_SAFE_NO_PAD.encode(pkcs8.as_ref()));
        Ok(common.finish(self.algorithm, key))
    }
}

/// Ed25519 factory. Generates a key pair and echoes the public JWK.
#[derive(Debug, Clone, Copy, Default)]
pub struct EddsaFactory;

impl ConfigFactory for EddsaFactory {
    fn config_kind(&self) -> TypeId {
        TypeId::of::<JwtTokenizerConfig>()
    }

    fn key(&self) -> &'static str {
        KEY
    }

    fn selector(&self) -> &str {
        SigningAlgorithm::EdDSA.as_str()
    }

    fn build(&self, input: &Map<String, Value>) -> Result<BuiltConfig, GatewayError> {
        let mut common = Common::parse(input)?;
        let rng = SystemRandom::new();

        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|_| GatewayError::internal("Ed25519 key generation failed"))?;
        let pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref())
            .map_err(|e| GatewayError::internal(format!("generated Ed25519 key rejected: {e}")))?;

        let mut jwk = Map::new();
        jwk.insert("kty".to_string(), json!("OKP"));
        jwk.insert("crv".to_string(), json!("Ed25519"));
        jwk.insert(
            "x".to_string(),
            json!(URL_SAFE_NO_PAD.encode(pair.public_key().as_ref())),
        );
        publish_jwk(&mut common, SigningAlgorithm::EdDSA, jwk);

        let key = KeyMaterial::Pkcs8(URL_SAFE_NO_PAD.encode(pkcs8.as_ref()));
        Ok(common.finish(SigningAlgorithm::EdDSA, key))
    }
}

/// RSA factory (PKCS#1 v1.5 and PSS). The caller supplies `privateKey` as PEM.
#[derive(Debug, Clone, Copy)]
pub struct RsaFactory {
    algorithm: SigningAlgorithm,
}

impl RsaFactory {
    /// Factory for an RSA algorithm.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for non-RSA algorithms.
    pub fn new(algorithm: SigningAlgorithm) -> Result<Self, GatewayError> {
        match algorithm {
            SigningAlgorithm::RS256
            | SigningAlgorithm::RS384
            | SigningAlgorithm::RS512
            | SigningAlgorithm::PS256
            | SigningAlgorithm::PS384
            | SigningAlgorithm::PS512 => Ok(Self { algorithm }),
            other => Err(GatewayError::configuration(format!(
                "{other} is not an RSA algorithm"
            ))),
        }
    }
}

impl ConfigFactory for RsaFactory {
    fn config_kind(&self) -> TypeId {
        TypeId::of::<JwtTokenizerConfig>()
    }

    fn key(&self) -> &'static str {
        KEY
    }

    fn selector(&self) -> &str {
        self.algorithm.as_str()
    }

    fn build(&self, input: &Map<String, Value>) -> Result<BuiltConfig, GatewayError> {
        let common = Common::parse(input)?;
        let raw: RsaInput = parse_input(KEY, input)?;

        let pem = raw.private_key.ok_or_else(|| {
            GatewayError::validation(format!("{KEY}: {} requires privateKey", self.algorithm))
        })?;
        EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|_| {
            GatewayError::validation(format!("{KEY}: privateKey is not an RSA PEM private key"))
        })?;

        Ok(common.finish(self.algorithm, KeyMaterial::Pem(pem)))
    }
}

/// Every built-in `jwt` factory.
///
/// # Errors
///
/// Propagates RSA factory construction errors.
pub fn all() -> Result<Vec<Arc<dyn ConfigFactory>>, GatewayError> {
    let mut factories: Vec<Arc<dyn ConfigFactory>> = vec![
        Arc::new(HmacFactory::default_selector()),
        Arc::new(HmacFactory::new(SigningAlgorithm::HS256)),
        Arc::new(HmacFactory::new(SigningAlgorithm::HS384)),
        Arc::new(HmacFactory::new(SigningAlgorithm::HS512)),
        Arc::new(EcdsaFactory::es256()),
        Arc::new(EcdsaFactory::es384()),
        Arc::new(EddsaFactory),
    ];
    for algorithm in [
        SigningAlgorithm::RS256,
        SigningAlgorithm::RS384,
        SigningAlgorithm::RS512,
        SigningAlgorithm::PS256,
        SigningAlgorithm::PS384,
        SigningAlgorithm::PS512,
    ] {
        factories.push(Arc::new(RsaFactory::new(algorithm)?));
    }
    Ok(factories)
}
