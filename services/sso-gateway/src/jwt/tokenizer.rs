//! Turns a composed claim set into a compact token.

use super::jwe;
use crate::clock::Clock;
use crate::error::GatewayError;
use crate::feature::{Audience, FeatureConfig, JwtTokenizerConfig, KeyMaterial, downcast_ref};
use crate::jwt::algorithm::SigningAlgorithm;
use crate::metrics;
use crate::payload::Claims;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Produces tokens for one tokenizer config kind.
pub trait Tokenizer: Send + Sync {
    /// Whether this tokenizer handles `config`.
    fn supports(&self, config: &dyn FeatureConfig) -> bool;

    /// Serialize `payload` for `subject` into a compact token.
    ///
    /// # Errors
    ///
    /// Returns a token error if signing or encryption fails.
    fn tokenize(
        &self,
        subject: &str,
        payload: Claims,
        config: &dyn FeatureConfig,
    ) -> Result<String, GatewayError>;
}

/// Signs with `jsonwebtoken` and optionally nests the result in a JWE.
#[derive(Clone)]
pub struct JwtTokenizer {
    issuer: Option<String>,
    clock: Arc<dyn Clock>,
}

impl JwtTokenizer {
    /// Create a tokenizer. `issuer` fills `iss` when the payload lacks it.
    pub fn new(issuer: Option<String>, clock: Arc<dyn Clock>) -> Self {
        Self { issuer, clock }
    }

    /// Put the registered claims first, taking explicit payload values over
    /// the defaults.
    fn fill_defaults(
        &self,
        subject: &str,
        mut payload: Claims,
        config: &JwtTokenizerConfig,
    ) -> Result<Claims, GatewayError> {
        let now = self.clock.now();
        let expiry = if payload.contains_key("exp") {
            None
        } else {
            let issued_at = payload.get("iat").and_then(Value::as_i64).unwrap_or(now);
            let exp = issued_at
                .checked_add(config.ttl)
                .ok_or_else(|| GatewayError::token("expiry is out of range"))?;
            Some(json!(exp))
        };
        let audience = config.audience.as_ref().map(|aud| match aud {
            Audience::One(one) => json!(one),
            Audience::Many(many) => json!(many),
        });

        let defaults = [
            ("iss", self.issuer.as_ref().map(|iss| json!(iss))),
            ("sub", Some(json!(subject))),
            ("aud", audience),
            ("iat", Some(json!(now))),
            ("nbf", Some(json!(now))),
            ("exp", expiry),
            ("jti", Some(json!(uuid::Uuid::new_v4().to_string()))),
        ];

        let mut claims = Claims::new();
        for (name, default) in defaults {
            if let Some(value) = payload.remove(name).or(default) {
                claims.insert(name.to_string(), value);
            }
        }
        claims.extend(payload);
        Ok(claims)
    }
}

fn encoding_key(algorithm: SigningAlgorithm, key: &KeyMaterial) -> Result<EncodingKey, GatewayError> {
    match (algorithm, key) {
        (SigningAlgorithm::HS256 | SigningAlgorithm::HS384 | SigningAlgorithm::HS512, KeyMaterial::Secret(secret)) => {
            Ok(EncodingKey::from_secret(secret.as_bytes()))
        }
        (SigningAlgorithm::ES256 | SigningAlgorithm::ES384, KeyMaterial::Pkcs8(der)) => {
            Ok(EncodingKey::from_ec_der(&decode_der(der)?))
        }
        (SigningAlgorithm::EdDSA, KeyMaterial::Pkcs8(der)) => Ok(EncodingKey::from_ed_der(&decode_der(der)?)),
        (
            SigningAlgorithm::RS256
            | SigningAlgorithm::RS384
            | SigningAlgorithm::RS512
            | SigningAlgorithm::PS256
            | SigningAlgorithm::PS384
            | SigningAlgorithm::PS512,
            KeyMaterial::Pem(pem),
        ) => Ok(EncodingKey::from_rsa_pem(pem.as_bytes())?),
        (algorithm, key) => Err(GatewayError::configuration(format!(
            "{algorithm} cannot sign with {key:?}"
        ))),
    }
}

fn decode_der(der: &str) -> Result<Vec<u8>, GatewayError> {
    URL_SAFE_NO_PAD
        .decode(der.as_bytes())
        .map_err(|_| GatewayError::token("stored key is not base64url"))
}

impl Tokenizer for JwtTokenizer {
    fn supports(&self, config: &dyn FeatureConfig) -> bool {
        downcast_ref::<JwtTokenizerConfig>(config).is_some()
    }

    #[instrument(skip(self, payload, config))]
    fn tokenize(
        &self,
        subject: &str,
        payload: Claims,
        config: &dyn FeatureConfig,
    ) -> Result<String, GatewayError> {
        let config = downcast_ref::<JwtTokenizerConfig>(config).ok_or_else(|| {
            GatewayError::configuration(format!(
                "jwt tokenizer cannot handle a '{}' config",
                config.feature()
            ))
        })?;

        let claims = self.fill_defaults(subject, payload, config)?;
        let mut header = Header::new(config.algorithm.to_jwt());
        header.kid.clone_from(&config.key_id);

        let key = encoding_key(config.algorithm, &config.key)?;
        let signed = encode(&header, &claims, &key)?;

        let (token, form) = match &config.encryption {
            Some(encryption) => (jwe::encrypt_compact(signed.as_bytes(), encryption)?, "nested"),
            None => (signed, "signed"),
        };

        metrics::record_token_issued(config.algorithm.as_str(), form);
        debug!(algorithm = %config.algorithm, form, "Token issued");
        Ok(token)
    }
}
