//! Factory for the `fetch` feature.

use super::{BuiltConfig, ConfigFactory, parse_input};
use crate::error::GatewayError;
use crate::feature::JsonFetcherConfig;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::any::TypeId;
use rust_common::extra_headers;
use std::collections::BTreeMap;
use url::Url;

const KEY: &str = JsonFetcherConfig::FEATURE;

#[derive(Debug, Deserialize)]
struct FetchInput {
    url: Option<String>,
    #[serde(default)]
    claims: Vec<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    timeout: Option<u64>,
}

/// Builds [`JsonFetcherConfig`] from `{"url", "claims", "headers", "timeout"}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFetcherFactory;

impl ConfigFactory for JsonFetcherFactory {
    fn config_kind(&self) -> TypeId {
        TypeId::of::<JsonFetcherConfig>()
    }

    fn key(&self) -> &'static str {
        KEY
    }

    fn build(&self, input: &Map<String, Value>) -> Result<BuiltConfig, GatewayError> {
        let raw: FetchInput = parse_input(KEY, input)?;

        let url = raw
            .url
            .ok_or_else(|| GatewayError::validation(format!("{KEY}: url is required")))?;
        let parsed = Url::parse(&url)
            .map_err(|e| GatewayError::validation(format!("{KEY}: invalid url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GatewayError::validation(format!(
                "{KEY}: url must use http or https"
            )));
        }
        extra_headers(&raw.headers)
            .map_err(|e| GatewayError::validation(format!("{KEY}: {e}")))?;
        if raw.timeout == Some(0) {
            return Err(GatewayError::validation(format!("{KEY}: timeout must be positive")));
        }

        Ok(BuiltConfig::plain(JsonFetcherConfig {
            url,
            claims: raw.claims,
            headers: raw.headers,
            timeout_secs: raw.timeout,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::downcast;
    use serde_json::json;

    fn build(value: Value) -> Result<BuiltConfig, GatewayError> {
        let Value::Object(map) = value else {
            panic!("not an object")
        };
        JsonFetcherFactory.build(&map)
    }

    #[test]
    fn test_builds_config() {
        let built = build(json!({
            "url": "https://claims.example.com/v1",
            "claims": ["uid", "groups[]"],
            "headers": {"authorization": "Bearer t"},
            "timeout": 3
        }))
        .unwrap();

        assert!(built.side_output.is_none());
        let config = downcast::<JsonFetcherConfig>(built.config).unwrap();
        assert_eq!(config.url, "https://claims.example.com/v1");
        assert_eq!(config.claims.len(), 2);
        assert_eq!(config.headers["authorization"], "Bearer t");
        assert_eq!(config.timeout_secs, Some(3));
    }

    #[test]
    fn test_url_required() {
        assert!(matches!(build(json!({})), Err(GatewayError::Validation(_))));
    }

    #[test]
    fn test_url_scheme_checked() {
        assert!(build(json!({"url": "ftp://example.com"})).is_err());
        assert!(build(json!({"url": "not a url"})).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(build(json!({"url": "http://localhost", "timeout": 0})).is_err());
    }

    #[test]
    fn test_reserved_header_rejected() {
        let result = build(json!({
            "url": "https://claims.example.com",
            "headers": {"Host": "internal.example.com"}
        }));
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[test]
    fn test_unsendable_header_rejected() {
        let result = build(json!({
            "url": "https://claims.example.com",
            "headers": {"x-api-key": "a\r\nb"}
        }));
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }
}
