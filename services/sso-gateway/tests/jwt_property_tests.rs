//! Property-based tests for token production.
//!
//! Covers registered-claim defaults, precedence of explicit claims and
//! nested token unwrapping.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{DecodingKey, Validation, decode};
use proptest::prelude::*;
use serde_json::{Value, json};
use sso_gateway::clock::FixedClock;
use sso_gateway::feature::{EncryptionConfig, JwtTokenizerConfig, KeyMaterial};
use sso_gateway::jwt::{
    ContentEncryption, JwtTokenizer, KeyManagement, SigningAlgorithm, Tokenizer, decrypt_compact,
};
use sso_gateway::payload::Claims;
use std::sync::Arc;

const SECRET: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

fn arb_hmac() -> impl Strategy<Value = (SigningAlgorithm, jsonwebtoken::Algorithm)> {
    prop::sample::select(vec![
        (SigningAlgorithm::HS256, jsonwebtoken::Algorithm::HS256),
        (SigningAlgorithm::HS384, jsonwebtoken::Algorithm::HS384),
        (SigningAlgorithm::HS512, jsonwebtoken::Algorithm::HS512),
    ])
}

fn arb_extra_claims() -> impl Strategy<Value = Claims> {
    prop::collection::btree_map(
        "x_[a-z]{1,8}",
        prop_oneof![
            "[a-z]{0,10}".prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
        ],
        0..5,
    )
    .prop_map(|map| map.into_iter().collect())
}

fn config(algorithm: SigningAlgorithm, ttl: i64) -> JwtTokenizerConfig {
    JwtTokenizerConfig {
        algorithm,
        key: KeyMaterial::Secret(SECRET.to_string()),
        key_id: None,
        ttl,
        audience: None,
        claims: Vec::new(),
        encryption: None,
    }
}

fn decode_claims(token: &str, algorithm: jsonwebtoken::Algorithm) -> Claims {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    decode::<Claims>(token, &DecodingKey::from_secret(SECRET.as_bytes()), &validation)
        .unwrap()
        .claims
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Expiry is issuance plus the configured lifetime, zero included.
    #[test]
    fn prop_expiry_is_issuance_plus_ttl(
        (algorithm, jwt_alg) in arb_hmac(),
        now in 1_000_000_000i64..4_000_000_000,
        ttl in 0i64..10_000_000,
    ) {
        let tokenizer = JwtTokenizer::new(None, Arc::new(FixedClock::new(now)));
        let token = tokenizer.tokenize("u1", Claims::new(), &config(algorithm, ttl)).unwrap();
        let claims = decode_claims(&token, jwt_alg);

        prop_assert_eq!(&claims["iat"], &json!(now));
        prop_assert_eq!(&claims["nbf"], &json!(now));
        prop_assert_eq!(&claims["exp"], &json!(now + ttl));
        prop_assert!(claims.get("iss").is_none());
    }

    /// Composed claims reach the token untouched, alongside the defaults.
    #[test]
    fn prop_payload_claims_survive(
        (algorithm, jwt_alg) in arb_hmac(),
        extra in arb_extra_claims(),
        subject in "[a-z0-9]{1,16}",
    ) {
        let tokenizer = JwtTokenizer::new(Some("https://sso".to_string()), Arc::new(FixedClock::new(1_700_000_000)));
        let token = tokenizer.tokenize(&subject, extra.clone(), &config(algorithm, 60)).unwrap();
        let claims = decode_claims(&token, jwt_alg);

        for (name, value) in &extra {
            prop_assert_eq!(claims.get(name), Some(value));
        }
        prop_assert_eq!(&claims["sub"], &json!(subject));
        prop_assert_eq!(&claims["iss"], &json!("https://sso"));
    }

    /// Every nested token unwraps to a verifiable signed token.
    #[test]
    fn prop_nested_token_unwraps(
        alg in prop::sample::select(vec![KeyManagement::Direct, KeyManagement::A128GcmKw, KeyManagement::A256GcmKw]),
        enc in prop::sample::select(vec![ContentEncryption::A128Gcm, ContentEncryption::A256Gcm]),
        zip in any::<bool>(),
        fill in any::<u8>(),
    ) {
        let key = vec![fill; alg.key_len(enc)];
        let mut config = config(SigningAlgorithm::HS256, 60);
        config.encryption = Some(EncryptionConfig {
            alg,
            enc,
            key: URL_SAFE_NO_PAD.encode(&key),
            zip,
        });

        let tokenizer = JwtTokenizer::new(None, Arc::new(FixedClock::new(1_700_000_000)));
        let token = tokenizer.tokenize("u1", Claims::new(), &config).unwrap();
        let inner = decrypt_compact(&token, &key).unwrap();

        prop_assert_eq!(token.split('.').count(), 5);
        prop_assert_eq!(&decode_claims(&inner, jsonwebtoken::Algorithm::HS256)["sub"], &json!("u1"));
    }
}
