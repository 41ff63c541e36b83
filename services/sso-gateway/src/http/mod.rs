//! Thin HTTP surface: registration, health and metrics.
//!
//! | Method | Path        | Handler    |
//! |--------|-------------|------------|
//! | POST   | `/register` | `register` |
//! | GET    | `/health`   | `health`   |
//! | GET    | `/metrics`  | `metrics`  |

use crate::error::GatewayError;
use crate::metrics as gateway_metrics;
use crate::registration::Registrar;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    registrar: Registrar,
}

impl AppState {
    /// Create handler state.
    #[must_use]
    pub const fn new(registrar: Registrar) -> Self {
        Self { registrar }
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::Integrity => StatusCode::NOT_FOUND,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status == StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

async fn register(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let input: Value = match serde_json::from_slice(&body) {
        Ok(input) => input,
        Err(e) => {
            warn!(error = %e, "Malformed registration body");
            return GatewayError::validation("malformed JSON body").into_response();
        }
    };

    match state.registrar.register(&input).await {
        Ok(registration) => (StatusCode::OK, Json(registration.to_response())).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gateway_metrics::render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::Config;
    use crate::gateway::Gateway;
    use crate::payload::Extensions;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use rust_common::MemoryKv;
    use tower::ServiceExt;

    fn app(kv: &MemoryKv) -> Router {
        let config = Config::from_lookup(|_| None).unwrap();
        let gateway = Gateway::new(
            Arc::new(kv.clone()),
            Arc::new(FixedClock::new(1_700_000_000)),
            &config,
            Extensions::new(),
        )
        .unwrap();
        router(AppState::new(gateway.registrar))
    }

    async fn post_register(app: Router, body: &'static str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post("/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_register_ok() {
        let kv = MemoryKv::new();
        let (status, body) = post_register(app(&kv), r##"{"jwt": {"#": "ES256", "ttl": 600}}"##).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["client"]["id"].is_string());
        assert!(body["client"]["secret"].is_string());
        assert_eq!(body["jwt"]["jwk"]["kty"], "EC");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let kv = MemoryKv::new();
        let (status, body) = post_register(app(&kv), "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "malformed JSON body");
        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn test_validation_failure_is_bad_request() {
        let kv = MemoryKv::new();
        let (status, body) = post_register(app(&kv), r##"{"jwt": {"ttl": -5}}"##).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("jwt:"));
    }

    #[tokio::test]
    async fn test_internal_errors_are_opaque() {
        let response = GatewayError::internal("redis at 10.0.0.1 down").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "service unavailable");
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let kv = MemoryKv::new();
        let response = app(&kv)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        gateway_metrics::record_fetch("success");
        let response = app(&kv)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("sso_gateway_fetch_calls_total"));
    }
}
