//! End-to-end flows through the wired gateway over the in-memory backend.

use futures::TryStreamExt;
use jsonwebtoken::{DecodingKey, Validation, decode};
use rust_common::{KvBackend, MemoryKv};
use serde_json::json;
use sso_gateway::clock::FixedClock;
use sso_gateway::jwt::decrypt_compact;
use sso_gateway::payload::{Claims, Extensions, SessionAttributes};
use sso_gateway::{ClientId, ClientSecret, Config, Gateway, GatewayError, LoginContext};
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOW: i64 = 1_700_000_000;
const SECRET: &str = "0123456789abcdef0123456789abcdef";

struct Harness {
    kv: Arc<MemoryKv>,
    clock: Arc<FixedClock>,
    gateway: Gateway,
}

fn harness() -> Harness {
    let kv = Arc::new(MemoryKv::new());
    let clock = Arc::new(FixedClock::new(NOW));
    let config = Config::from_lookup(|_| None).unwrap();
    let gateway = Gateway::new(kv.clone(), clock.clone(), &config, Extensions::new()).unwrap();
    Harness { kv, clock, gateway }
}

async fn keys(kv: &MemoryKv, pattern: &str) -> Vec<String> {
    let mut keys: Vec<String> = kv.scan(pattern).try_collect().await.unwrap();
    keys.sort();
    keys
}

fn login(id: &ClientId, secret: &ClientSecret, attributes: SessionAttributes) -> LoginContext {
    LoginContext {
        client_id: id.clone(),
        secret: secret.clone(),
        subject: "u1".to_string(),
        attributes,
    }
}

fn decode_claims(token: &str) -> Claims {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    decode::<Claims>(token, &DecodingKey::from_secret(SECRET.as_bytes()), &validation)
        .unwrap()
        .claims
}

#[tokio::test]
async fn test_unmatched_selector_writes_nothing() {
    let h = harness();

    let result = h.gateway.registrar.register(&json!({"jwt": {"#": "XX999"}})).await;

    assert!(matches!(result, Err(GatewayError::Validation(_))));
    assert!(keys(&h.kv, "*").await.is_empty());
}

#[tokio::test]
async fn test_missing_required_feature_writes_nothing() {
    let h = harness();

    let result = h
        .gateway
        .registrar
        .register(&json!({"fetch": {"url": "https://example.com/claims"}}))
        .await;

    let Err(GatewayError::Validation(message)) = result else {
        panic!("expected a validation error");
    };
    assert!(message.contains("jwt"));
    assert!(keys(&h.kv, "*").await.is_empty());
}

#[tokio::test]
async fn test_unknown_feature_is_ignored() {
    let h = harness();

    let registration = h
        .gateway
        .registrar
        .register(&json!({"jwt": {"secret": SECRET}, "saml": {"entityId": "x"}}))
        .await
        .unwrap();

    let id = registration.client_id.as_str();
    assert_eq!(keys(&h.kv, "config:jwt:*").await, vec![format!("config:jwt:{id}")]);
    assert!(keys(&h.kv, "config:fetch:*").await.is_empty());
    assert!(keys(&h.kv, "config:saml:*").await.is_empty());
}

#[tokio::test]
async fn test_optional_feature_with_unmatched_selector_is_skipped() {
    let h = harness();

    let registration = h
        .gateway
        .registrar
        .register(&json!({
            "jwt": {"secret": SECRET},
            "fetch": {"#": "xml", "url": "https://example.com/claims"}
        }))
        .await
        .unwrap();

    let id = registration.client_id.as_str();
    assert_eq!(keys(&h.kv, "config:jwt:*").await, vec![format!("config:jwt:{id}")]);
    assert!(keys(&h.kv, "config:fetch:*").await.is_empty());
}

#[tokio::test]
async fn test_matched_factory_rejection_still_fails() {
    let h = harness();

    let result = h
        .gateway
        .registrar
        .register(&json!({
            "jwt": {"secret": SECRET},
            "fetch": {"url": "ftp://example.com/claims"}
        }))
        .await;

    assert!(matches!(result, Err(GatewayError::Validation(_))));
    assert!(keys(&h.kv, "*").await.is_empty());
}

#[tokio::test]
async fn test_issued_token_carries_ttl() {
    let h = harness();
    let registration = h
        .gateway
        .registrar
        .register(&json!({"jwt": {"secret": SECRET, "ttl": 600}}))
        .await
        .unwrap();

    let token = h
        .gateway
        .issuer
        .issue(&login(&registration.client_id, &registration.secret, SessionAttributes::new()))
        .await
        .unwrap();
    let claims = decode_claims(&token);

    assert_eq!(claims["iat"], json!(NOW));
    assert_eq!(claims["nbf"], json!(NOW));
    assert_eq!(claims["exp"], json!(NOW + 600));
    assert_eq!(claims["sub"], json!("u1"));
}

#[tokio::test]
async fn test_fetched_claims_are_merged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/claims"))
        .and(body_json(json!({"sub": "u1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"role": "admin"})))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness();
    let registration = h
        .gateway
        .registrar
        .register(&json!({
            "jwt": {"secret": SECRET, "claims": ["sub"]},
            "fetch": {"url": format!("{}/claims", server.uri()), "claims": ["sub"]},
        }))
        .await
        .unwrap();

    let attributes = SessionAttributes::new().with("sub", vec![json!("u1")]);
    let token = h
        .gateway
        .issuer
        .issue(&login(&registration.client_id, &registration.secret, attributes))
        .await
        .unwrap();
    let claims = decode_claims(&token);

    assert_eq!(claims["sub"], json!("u1"));
    assert_eq!(claims["role"], json!("admin"));
}

#[tokio::test]
async fn test_fetch_failure_aborts_issuance() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let h = harness();
    let registration = h
        .gateway
        .registrar
        .register(&json!({"jwt": {"secret": SECRET}, "fetch": {"url": server.uri()}}))
        .await
        .unwrap();

    let result = h
        .gateway
        .issuer
        .issue(&login(&registration.client_id, &registration.secret, SessionAttributes::new()))
        .await;
    assert!(matches!(result, Err(GatewayError::Transport(_))));
}

#[tokio::test]
async fn test_wrong_secret_and_unknown_client_look_alike() {
    let h = harness();
    let registration = h
        .gateway
        .registrar
        .register(&json!({"jwt": {"secret": SECRET}}))
        .await
        .unwrap();

    let wrong = h
        .gateway
        .issuer
        .issue(&login(&registration.client_id, &ClientSecret::generate(), SessionAttributes::new()))
        .await;
    let unknown = h
        .gateway
        .issuer
        .issue(&login(&ClientId::generate(), &registration.secret, SessionAttributes::new()))
        .await;

    assert!(matches!(wrong, Err(GatewayError::NotFound)));
    assert!(matches!(unknown, Err(GatewayError::NotFound)));
}

#[tokio::test]
async fn test_registration_echoes_generated_material() {
    let h = harness();
    let registration = h
        .gateway
        .registrar
        .register(&json!({"jwt": {"#": "EdDSA", "encryption": {"alg": "dir", "enc": "A256GCM"}}}))
        .await
        .unwrap();

    let body = registration.to_response();
    assert_eq!(body["client"]["id"], json!(registration.client_id.as_str()));
    assert_eq!(body["client"]["secret"], json!(registration.secret.expose()));
    assert_eq!(body["jwt"]["jwk"]["crv"], json!("Ed25519"));
    assert!(body["jwt"]["encryption"]["key"].is_string());
}

#[tokio::test]
async fn test_nested_token_decrypts_to_signed_token() {
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let h = harness();
    let key = URL_SAFE_NO_PAD.encode([9u8; 16]);
    let registration = h
        .gateway
        .registrar
        .register(&json!({"jwt": {
            "secret": SECRET,
            "encryption": {"alg": "A128GCMKW", "enc": "A256GCM", "key": key, "zip": "DEF"},
        }}))
        .await
        .unwrap();
    assert!(registration.side_outputs.get("jwt").is_none());

    let token = h
        .gateway
        .issuer
        .issue(&login(&registration.client_id, &registration.secret, SessionAttributes::new()))
        .await
        .unwrap();
    assert_eq!(token.split('.').count(), 5);

    let inner = decrypt_compact(&token, &[9u8; 16]).unwrap();
    assert_eq!(decode_claims(&inner)["sub"], json!("u1"));
}

#[tokio::test]
async fn test_inactive_clients_are_swept() {
    let h = harness();
    let stale = h
        .gateway
        .registrar
        .register(&json!({"jwt": {"secret": SECRET}}))
        .await
        .unwrap();

    h.clock.advance(30 * 86_400);
    let fresh = h
        .gateway
        .registrar
        .register(&json!({"jwt": {"secret": SECRET}, "fetch": {"url": "https://example.com"}}))
        .await
        .unwrap();

    h.clock.advance(61 * 86_400);
    let candidates = h.gateway.sweep.candidates().await.unwrap();
    assert_eq!(candidates, vec![stale.client_id.clone()]);

    let report = h.gateway.sweep.purge(&candidates).await;
    assert!(report.is_complete());
    assert_eq!(report.clients, 1);

    let remaining = keys(&h.kv, "*").await;
    assert_eq!(remaining.len(), 4);
    assert!(remaining.iter().all(|k| k.ends_with(fresh.client_id.as_str())));
}

#[tokio::test]
async fn test_login_refreshes_last_access() {
    let h = harness();
    let registration = h
        .gateway
        .registrar
        .register(&json!({"jwt": {"secret": SECRET}}))
        .await
        .unwrap();

    h.clock.advance(80 * 86_400);
    h.gateway
        .issuer
        .issue(&login(&registration.client_id, &registration.secret, SessionAttributes::new()))
        .await
        .unwrap();
    h.clock.advance(20 * 86_400);

    assert!(h.gateway.sweep.candidates().await.unwrap().is_empty());
    assert_eq!(h.gateway.sweep.threshold(), NOW + 10 * 86_400);
}
