//! Feature configs attached to a client.
//!
//! The set of feature kinds is open: every kind is a plain serde value type
//! implementing [`FeatureConfig`], and the registries dispatch on its
//! [`TypeId`].

pub mod fetch;
pub mod jwt;

pub use fetch::JsonFetcherConfig;
pub use jwt::{Audience, EncryptionConfig, JwtTokenizerConfig, KeyMaterial};

use std::any::{Any, TypeId};
use std::fmt::Debug;

/// Type-erasure helpers for feature configs.
pub trait AsAny {
    /// Borrow as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Convert a boxed config into `Any` for downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A typed configuration value for one pluggable capability.
pub trait FeatureConfig: AsAny + Debug + Send + Sync {
    /// Registration key this config belongs to (e.g. `"jwt"`).
    fn feature(&self) -> &'static str;

    /// Session attribute names this feature pulls into a claim set.
    fn claim_names(&self) -> &[String] {
        &[]
    }
}

/// Concrete type id of a boxed or borrowed config.
#[must_use]
pub fn kind_of(config: &dyn FeatureConfig) -> TypeId {
    config.as_any().type_id()
}

/// Borrow a config as its concrete type.
#[must_use]
pub fn downcast_ref<C: FeatureConfig + 'static>(config: &dyn FeatureConfig) -> Option<&C> {
    config.as_any().downcast_ref::<C>()
}

/// Take ownership of a config as its concrete type.
#[must_use]
pub fn downcast<C: FeatureConfig + 'static>(config: Box<dyn FeatureConfig>) -> Option<C> {
    config.into_any().downcast::<C>().ok().map(|boxed| *boxed)
}
