//! Property-based tests for config encoding, encryption and store opacity.

use proptest::prelude::*;
use rust_common::MemoryKv;
use sso_gateway::codec::{ConfigCodec, JsonCodec, SecretCipher};
use sso_gateway::feature::{
    Audience, EncryptionConfig, JsonFetcherConfig, JwtTokenizerConfig, KeyMaterial, downcast,
};
use sso_gateway::jwt::{ContentEncryption, KeyManagement, SigningAlgorithm};
use sso_gateway::storage::{ConfigStore, NamespacedConfigStore};
use sso_gateway::{ClientId, ClientSecret, GatewayError};
use std::collections::BTreeMap;
use std::sync::Arc;

fn arb_claim_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z_]{1,12}(\\[\\])?", 0..6)
}

fn arb_fetcher_config() -> impl Strategy<Value = JsonFetcherConfig> {
    (
        "https://[a-z]{1,12}\\.example\\.com/[a-z]{0,8}",
        arb_claim_names(),
        prop::collection::btree_map("x-[a-z]{1,8}", "[ -~]{0,16}", 0..3),
        prop::option::of(1u64..120),
    )
        .prop_map(|(url, claims, headers, timeout_secs)| JsonFetcherConfig {
            url,
            claims,
            headers,
            timeout_secs,
        })
}

fn arb_algorithm() -> impl Strategy<Value = SigningAlgorithm> {
    prop::sample::select(vec![
        SigningAlgorithm::HS256,
        SigningAlgorithm::HS384,
        SigningAlgorithm::HS512,
        SigningAlgorithm::ES256,
        SigningAlgorithm::EdDSA,
        SigningAlgorithm::RS256,
        SigningAlgorithm::PS256,
    ])
}

fn arb_key() -> impl Strategy<Value = KeyMaterial> {
    prop_oneof![
        "[ -~]{32,64}".prop_map(KeyMaterial::Secret),
        "[A-Za-z0-9_-]{40,80}".prop_map(KeyMaterial::Pkcs8),
        "[ -~\n]{40,80}".prop_map(KeyMaterial::Pem),
    ]
}

fn arb_audience() -> impl Strategy<Value = Option<Audience>> {
    prop::option::of(prop_oneof![
        "[a-z]{1,10}".prop_map(Audience::One),
        prop::collection::vec("[a-z]{1,10}", 0..4).prop_map(Audience::Many),
    ])
}

fn arb_encryption() -> impl Strategy<Value = Option<EncryptionConfig>> {
    prop::option::of(
        (
            prop::sample::select(vec![
                KeyManagement::Direct,
                KeyManagement::A128GcmKw,
                KeyManagement::A256GcmKw,
            ]),
            prop::sample::select(vec![ContentEncryption::A128Gcm, ContentEncryption::A256Gcm]),
            "[A-Za-z0-9_-]{22,43}",
            any::<bool>(),
        )
            .prop_map(|(alg, enc, key, zip)| EncryptionConfig { alg, enc, key, zip }),
    )
}

fn arb_jwt_config() -> impl Strategy<Value = JwtTokenizerConfig> {
    (
        arb_algorithm(),
        arb_key(),
        prop::option::of("[a-zA-Z0-9-]{1,16}"),
        0i64..86_400,
        arb_audience(),
        arb_claim_names(),
        arb_encryption(),
    )
        .prop_map(
            |(algorithm, key, key_id, ttl, audience, claims, encryption)| JwtTokenizerConfig {
                algorithm,
                key,
                key_id,
                ttl,
                audience,
                claims,
                encryption,
            },
        )
}

fn arb_secret() -> impl Strategy<Value = String> {
    "[ -~]{1,64}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Fetcher configs survive marshal then unmarshal field for field.
    #[test]
    fn prop_fetcher_config_round_trip(config in arb_fetcher_config()) {
        let codec = JsonCodec::<JsonFetcherConfig>::new();
        let bytes = codec.marshal(&config).unwrap();
        let restored = downcast::<JsonFetcherConfig>(codec.unmarshal(&bytes).unwrap());

        prop_assert_eq!(restored, Some(config));
    }

    /// Tokenizer configs survive marshal then unmarshal field for field.
    #[test]
    fn prop_jwt_config_round_trip(config in arb_jwt_config()) {
        let codec = JsonCodec::<JwtTokenizerConfig>::new();
        let bytes = codec.marshal(&config).unwrap();
        let restored = downcast::<JwtTokenizerConfig>(codec.unmarshal(&bytes).unwrap());

        prop_assert_eq!(restored, Some(config));
    }

    /// Decrypting with the encrypting secret returns the original bytes.
    #[test]
    fn prop_decrypt_inverts_encrypt(
        payload in prop::collection::vec(any::<u8>(), 0..512),
        secret in arb_secret(),
        aad in "[a-z:]{0,32}",
    ) {
        let secret = ClientSecret::new(secret);
        let blob = SecretCipher::encrypt(&payload, &secret, aad.as_bytes()).unwrap();
        let plain = SecretCipher::decrypt(&blob, &secret, aad.as_bytes()).unwrap();

        prop_assert_eq!(plain, payload);
    }

    /// Any other secret fails closed with an integrity error.
    #[test]
    fn prop_wrong_secret_fails_closed(
        payload in prop::collection::vec(any::<u8>(), 0..256),
        s1 in arb_secret(),
        s2 in arb_secret(),
    ) {
        prop_assume!(s1 != s2);
        let blob = SecretCipher::encrypt(&payload, &ClientSecret::new(s1), b"aad").unwrap();
        let result = SecretCipher::decrypt(&blob, &ClientSecret::new(s2), b"aad");

        prop_assert!(matches!(result, Err(GatewayError::Integrity)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A wrong secret and an unknown client produce the same empty answer.
    #[test]
    fn prop_store_wrong_secret_looks_absent(
        config in arb_fetcher_config(),
        s1 in arb_secret(),
        s2 in arb_secret(),
    ) {
        prop_assume!(s1 != s2);
        let store = NamespacedConfigStore::for_config::<JsonFetcherConfig>(
            Arc::new(MemoryKv::new()),
            "fetch",
            false,
        );
        let id = ClientId::generate();

        let (right, wrong, unknown) = tokio_test::block_on(async {
            store.persist(&id, &config, &ClientSecret::new(s1.clone())).await.unwrap();
            let right = store.find(&id, &ClientSecret::new(s1)).await.unwrap();
            let wrong = store.find(&id, &ClientSecret::new(s2.clone())).await.unwrap();
            let unknown = store.find(&ClientId::generate(), &ClientSecret::new(s2)).await.unwrap();
            (right, wrong, unknown)
        });

        prop_assert_eq!(right.and_then(downcast::<JsonFetcherConfig>), Some(config));
        prop_assert!(wrong.is_none());
        prop_assert!(unknown.is_none());
    }
}

#[test]
fn test_headers_default_to_empty() {
    let json = r#"{"url":"https://example.com"}"#;
    let config: JsonFetcherConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.headers, BTreeMap::new());
    assert!(config.claims.is_empty());
}
