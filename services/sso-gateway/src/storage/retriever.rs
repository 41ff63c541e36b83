//! Type-directed config lookup across all registered stores.

use super::ConfigStore;
use crate::client::{ClientId, ClientSecret};
use crate::error::GatewayError;
use crate::feature::{FeatureConfig, downcast};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Routes lookups for a config kind to the single store that owns it.
///
/// Stores keep their registration order. Ownership is resolved once, at
/// construction, and ambiguity is rejected there.
#[derive(Clone)]
pub struct ConfigRetriever {
    stores: Vec<Arc<dyn ConfigStore>>,
    by_kind: HashMap<TypeId, usize>,
}

impl ConfigRetriever {
    /// Build a retriever over `stores`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if two stores share a namespace or claim
    /// the same config kind.
    pub fn new(stores: Vec<Arc<dyn ConfigStore>>) -> Result<Self, GatewayError> {
        let mut by_kind = HashMap::with_capacity(stores.len());
        let mut namespaces = HashSet::with_capacity(stores.len());

        for (index, store) in stores.iter().enumerate() {
            if !namespaces.insert(store.namespace().to_string()) {
                return Err(GatewayError::configuration(format!(
                    "namespace '{}' registered twice",
                    store.namespace()
                )));
            }
            let kind = store.kind();
            if let Some(other) = stores[..index]
                .iter()
                .find(|earlier| earlier.supports(kind) || store.supports(earlier.kind()))
            {
                return Err(GatewayError::configuration(format!(
                    "stores '{}' and '{}' both claim the same config kind",
                    other.namespace(),
                    store.namespace()
                )));
            }
            by_kind.insert(kind, index);
        }

        Ok(Self { stores, by_kind })
    }

    /// All stores in registration order.
    #[must_use]
    pub fn stores(&self) -> &[Arc<dyn ConfigStore>] {
        &self.stores
    }

    /// The store owning `kind`, if any.
    #[must_use]
    pub fn store_for(&self, kind: TypeId) -> Option<&Arc<dyn ConfigStore>> {
        self.by_kind.get(&kind).map(|&index| &self.stores[index])
    }

    /// Whether a config of kind `C` is stored for `id`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no store owns `C`.
    pub async fn exists<C: FeatureConfig + 'static>(&self, id: &ClientId) -> Result<bool, GatewayError> {
        self.owner::<C>()?.exists(id).await
    }

    /// Load the config of kind `C` for `id`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no store owns `C`, or propagates
    /// backend failures.
    pub async fn find<C: FeatureConfig + 'static>(
        &self,
        id: &ClientId,
        secret: &ClientSecret,
    ) -> Result<Option<C>, GatewayError> {
        let Some(config) = self.owner::<C>()?.find(id, secret).await? else {
            return Ok(None);
        };
        downcast::<C>(config)
            .map(Some)
            .ok_or_else(|| GatewayError::internal("store returned a config of the wrong kind"))
    }

    /// Load a config by kind without static typing.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no store owns `kind`.
    pub async fn find_dyn(
        &self,
        kind: TypeId,
        id: &ClientId,
        secret: &ClientSecret,
    ) -> Result<Option<Box<dyn FeatureConfig>>, GatewayError> {
        let store = self
            .store_for(kind)
            .ok_or_else(|| GatewayError::configuration("no store registered for config kind"))?;
        store.find(id, secret).await
    }

    fn owner<C: 'static>(&self) -> Result<&Arc<dyn ConfigStore>, GatewayError> {
        self.store_for(TypeId::of::<C>()).ok_or_else(|| {
            GatewayError::configuration(format!(
                "no store registered for {}",
                std::any::type_name::<C>()
            ))
        })
    }
}
