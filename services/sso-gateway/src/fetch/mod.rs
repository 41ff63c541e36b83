//! External claim sources consulted during payload composition.

pub mod json;

pub use json::JsonFetcher;

use crate::error::GatewayError;
use crate::feature::FeatureConfig;
use crate::payload::Claims;
use async_trait::async_trait;

/// Fetches extra claims for a fetcher config kind.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Whether this fetcher handles `config`.
    fn supports(&self, config: &dyn FeatureConfig) -> bool;

    /// Call the external source with `request` and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Transport` for any transport-level failure.
    async fn fetch(
        &self,
        config: &dyn FeatureConfig,
        request: &Claims,
    ) -> Result<Claims, GatewayError>;
}
