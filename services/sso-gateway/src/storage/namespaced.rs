//! Default [`ConfigStore`] implementation over a [`KvBackend`].

use super::ConfigStore;
use crate::client::{ClientId, ClientSecret};
use crate::codec::{ConfigCodec, JsonCodec, SecretCipher};
use crate::error::GatewayError;
use crate::feature::FeatureConfig;
use crate::metrics;
use async_trait::async_trait;
use rust_common::KvBackend;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::TypeId;
use std::sync::Arc;
use tracing::{debug, instrument};

const NAMESPACE_PREFIX: &str = "config:";

/// Store for one config kind under `config:<feature>:<client id>`.
///
/// The backend key doubles as the associated data of the encrypted blob, so a
/// blob copied to another client or namespace fails to decrypt.
pub struct NamespacedConfigStore {
    kv: Arc<dyn KvBackend>,
    codec: Box<dyn ConfigCodec>,
    namespace: String,
    feature: &'static str,
    kind: TypeId,
    required: bool,
}

impl NamespacedConfigStore {
    /// Create a JSON-encoded store for config kind `C`.
    pub fn for_config<C>(kv: Arc<dyn KvBackend>, feature: &'static str, required: bool) -> Self
    where
        C: FeatureConfig + Serialize + DeserializeOwned + 'static,
    {
        Self {
            kv,
            codec: Box::new(JsonCodec::<C>::new()),
            namespace: format!("{NAMESPACE_PREFIX}{feature}"),
            feature,
            kind: TypeId::of::<C>(),
            required,
        }
    }

    /// Replace the codec.
    #[must_use]
    pub fn with_codec(mut self, codec: Box<dyn ConfigCodec>) -> Self {
        self.codec = codec;
        self
    }
}

#[async_trait]
impl ConfigStore for NamespacedConfigStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn feature(&self) -> &'static str {
        self.feature
    }

    fn kind(&self) -> TypeId {
        self.kind
    }

    fn supports(&self, kind: TypeId) -> bool {
        kind == self.kind && self.codec.supports(kind)
    }

    fn is_required(&self) -> bool {
        self.required
    }

    async fn exists(&self, id: &ClientId) -> Result<bool, GatewayError> {
        Ok(self.kv.exists(&self.key_for(id)).await?)
    }

    #[instrument(skip(self, config, secret), fields(namespace = %self.namespace, client_id = %id))]
    async fn persist(
        &self,
        id: &ClientId,
        config: &dyn FeatureConfig,
        secret: &ClientSecret,
    ) -> Result<(), GatewayError> {
        if !self.supports_config(config) {
            return Err(GatewayError::configuration(format!(
                "store {} cannot persist a '{}' config",
                self.namespace,
                config.feature()
            )));
        }

        let key = self.key_for(id);
        let plaintext = zeroize::Zeroizing::new(self.codec.marshal(config)?);
        let blob = SecretCipher::encrypt(&plaintext, secret, key.as_bytes())?;
        self.kv.set(&key, &blob).await?;

        debug!(bytes = blob.len(), "Feature config persisted");
        Ok(())
    }

    #[instrument(skip(self, secret), fields(namespace = %self.namespace, client_id = %id))]
    async fn find(
        &self,
        id: &ClientId,
        secret: &ClientSecret,
    ) -> Result<Option<Box<dyn FeatureConfig>>, GatewayError> {
        let key = self.key_for(id);

        let Some(blob) = self.kv.get(&key).await? else {
            SecretCipher::decoy(secret, key.as_bytes());
            metrics::record_store_lookup(&self.namespace, false);
            return Ok(None);
        };

        let plaintext = match SecretCipher::decrypt(&blob, secret, key.as_bytes()) {
            Ok(plaintext) => zeroize::Zeroizing::new(plaintext),
            Err(GatewayError::Integrity) => {
                metrics::record_store_lookup(&self.namespace, false);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let config = self.codec.unmarshal(&plaintext)?;
        metrics::record_store_lookup(&self.namespace, true);
        Ok(Some(config))
    }

    #[instrument(skip(self, ids), fields(namespace = %self.namespace, count = ids.len()))]
    async fn remove(&self, ids: &[ClientId]) -> Result<u64, GatewayError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = ids.iter().map(|id| self.key_for(id)).collect();
        Ok(self.kv.del(&keys).await?)
    }
}
