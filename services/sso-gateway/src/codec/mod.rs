//! Feature config serialization and encryption.

pub mod cipher;

pub use cipher::SecretCipher;

use crate::error::GatewayError;
use crate::feature::{FeatureConfig, downcast_ref, kind_of};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::TypeId;
use std::marker::PhantomData;

/// Serializes one concrete feature config kind.
pub trait ConfigCodec: Send + Sync {
    /// Whether this codec handles configs of `kind`.
    fn supports(&self, kind: TypeId) -> bool;

    /// Serialize a config.
    ///
    /// # Errors
    ///
    /// Fails if the config is of an unsupported kind or cannot be encoded.
    fn marshal(&self, config: &dyn FeatureConfig) -> Result<Vec<u8>, GatewayError>;

    /// Deserialize a config.
    ///
    /// # Errors
    ///
    /// Fails if the bytes do not decode into the supported kind.
    fn unmarshal(&self, bytes: &[u8]) -> Result<Box<dyn FeatureConfig>, GatewayError>;
}

/// JSON codec for a serde-enabled config type.
pub struct JsonCodec<C> {
    _kind: PhantomData<fn() -> C>,
}

impl<C> JsonCodec<C> {
    /// Create a codec for `C`.
    #[must_use]
    pub const fn new() -> Self {
        Self { _kind: PhantomData }
    }
}

impl<C> Default for JsonCodec<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ConfigCodec for JsonCodec<C>
where
    C: FeatureConfig + Serialize + DeserializeOwned + 'static,
{
    fn supports(&self, kind: TypeId) -> bool {
        kind == TypeId::of::<C>()
    }

    fn marshal(&self, config: &dyn FeatureConfig) -> Result<Vec<u8>, GatewayError> {
        let typed = downcast_ref::<C>(config).ok_or_else(|| {
            GatewayError::internal(format!(
                "codec for {} cannot marshal {:?}",
                std::any::type_name::<C>(),
                kind_of(config)
            ))
        })?;
        Ok(serde_json::to_vec(typed)?)
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<Box<dyn FeatureConfig>, GatewayError> {
        let typed: C = serde_json::from_slice(bytes)?;
        Ok(Box::new(typed))
    }
}
