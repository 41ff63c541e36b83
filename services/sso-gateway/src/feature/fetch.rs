//! JSON payload fetcher feature config.

use super::FeatureConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for fetching extra claims from an HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonFetcherConfig {
    /// Endpoint receiving the POST
    pub url: String,
    /// Session attributes sent in the request body
    #[serde(default)]
    pub claims: Vec<String>,
    /// Extra request headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Per-call timeout in seconds, overriding the client default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl JsonFetcherConfig {
    /// Registration key.
    pub const FEATURE: &'static str = "fetch";
}

impl FeatureConfig for JsonFetcherConfig {
    fn feature(&self) -> &'static str {
        Self::FEATURE
    }

    fn claim_names(&self) -> &[String] {
        &self.claims
    }
}
