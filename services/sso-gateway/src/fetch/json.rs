//! HTTP JSON claim fetcher.

use super::Fetcher;
use crate::error::GatewayError;
use crate::feature::{FeatureConfig, JsonFetcherConfig, downcast_ref};
use crate::metrics;
use crate::payload::Claims;
use async_trait::async_trait;
use reqwest::Client;
use rust_common::{HttpConfig, build_http_client, extra_headers};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// POSTs the request claims as JSON and expects a JSON object back.
#[derive(Clone)]
pub struct JsonFetcher {
    client: Client,
}

impl JsonFetcher {
    /// Create a fetcher with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, GatewayError> {
        let client = build_http_client(config)
            .map_err(|e| GatewayError::configuration(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Create a fetcher over an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn call(
        &self,
        config: &JsonFetcherConfig,
        request: &Claims,
    ) -> Result<Claims, GatewayError> {
        let headers = extra_headers(&config.headers)
            .map_err(|e| GatewayError::configuration(e.to_string()))?;
        let mut builder = self.client.post(&config.url).headers(headers).json(request);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::transport(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::transport(format!(
                "endpoint answered {status}"
            )));
        }

        match response.json::<Value>().await {
            Ok(Value::Object(claims)) => Ok(claims),
            Ok(_) => Err(GatewayError::transport("response is not a JSON object")),
            Err(e) => Err(GatewayError::transport(format!("invalid response body: {e}"))),
        }
    }
}

#[async_trait]
impl Fetcher for JsonFetcher {
    fn supports(&self, config: &dyn FeatureConfig) -> bool {
        downcast_ref::<JsonFetcherConfig>(config).is_some()
    }

    #[instrument(skip(self, config, request))]
    async fn fetch(
        &self,
        config: &dyn FeatureConfig,
        request: &Claims,
    ) -> Result<Claims, GatewayError> {
        let config = downcast_ref::<JsonFetcherConfig>(config).ok_or_else(|| {
            GatewayError::configuration(format!(
                "json fetcher cannot handle a '{}' config",
                config.feature()
            ))
        })?;

        match self.call(config, request).await {
            Ok(claims) => {
                metrics::record_fetch("success");
                debug!(claims = claims.len(), "Fetched claims");
                Ok(claims)
            }
            Err(e) => {
                metrics::record_fetch("failure");
                warn!(url = %config.url, error = %e, "Claim fetch failed");
                Err(e)
            }
        }
    }
}
