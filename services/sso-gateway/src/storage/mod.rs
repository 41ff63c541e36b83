//! Encrypted per-feature config persistence.
//!
//! Every feature kind gets its own [`ConfigStore`] namespace over the shared
//! key-value backend. Stored blobs are encrypted under the client secret, so
//! a store can only hand a config back to the secret holder.

pub mod namespaced;
pub mod retriever;

pub use namespaced::NamespacedConfigStore;
pub use retriever::ConfigRetriever;

use crate::client::{ClientId, ClientSecret};
use crate::error::GatewayError;
use crate::feature::{FeatureConfig, kind_of};
use async_trait::async_trait;
use std::any::TypeId;

/// Persistence for one feature config kind.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Key prefix owned by this store, e.g. `config:jwt`.
    fn namespace(&self) -> &str;

    /// Registration key of the feature stored here.
    fn feature(&self) -> &'static str;

    /// Config kind stored here.
    fn kind(&self) -> TypeId;

    /// Whether this store answers for configs of `kind`.
    fn supports(&self, kind: TypeId) -> bool {
        kind == self.kind()
    }

    /// Whether this store answers for `config`.
    fn supports_config(&self, config: &dyn FeatureConfig) -> bool {
        self.supports(kind_of(config))
    }

    /// Whether registration must supply this feature.
    fn is_required(&self) -> bool;

    /// Backend key holding the config of `id`.
    fn key_for(&self, id: &ClientId) -> String {
        format!("{}:{id}", self.namespace())
    }

    /// Whether a config is stored for `id`. Does not check the secret.
    async fn exists(&self, id: &ClientId) -> Result<bool, GatewayError>;

    /// Encrypt and write `config`, replacing any earlier value.
    async fn persist(
        &self,
        id: &ClientId,
        config: &dyn FeatureConfig,
        secret: &ClientSecret,
    ) -> Result<(), GatewayError>;

    /// Load and decrypt the config of `id`.
    ///
    /// A missing entry and a wrong secret both yield `Ok(None)`.
    async fn find(
        &self,
        id: &ClientId,
        secret: &ClientSecret,
    ) -> Result<Option<Box<dyn FeatureConfig>>, GatewayError>;

    /// Delete the configs of `ids`, returning how many existed.
    async fn remove(&self, ids: &[ClientId]) -> Result<u64, GatewayError>;
}
