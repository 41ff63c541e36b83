//! Factories turning untrusted registration input into feature configs.
//!
//! A registration body maps feature keys to objects. The optional `#` field of
//! each object picks among factories competing for the same key; without it
//! the factory whose selector equals the key itself is used.

pub mod fetch;
pub mod jwt;

pub use fetch::JsonFetcherFactory;
pub use jwt::{EcdsaFactory, EddsaFactory, HmacFactory, RsaFactory};

use crate::error::GatewayError;
use crate::feature::FeatureConfig;
use serde_json::{Map, Value};
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

/// Input field naming the selector.
pub const SELECTOR_FIELD: &str = "#";

/// A config built from registration input.
#[derive(Debug)]
pub struct BuiltConfig {
    /// The config to persist
    pub config: Box<dyn FeatureConfig>,
    /// Data echoed back once to the registering caller, such as generated keys
    pub side_output: Option<Value>,
}

impl BuiltConfig {
    /// A config with nothing to echo back.
    pub fn plain(config: impl FeatureConfig + 'static) -> Self {
        Self {
            config: Box::new(config),
            side_output: None,
        }
    }
}

/// Builds one config kind for one `(key, selector)` pair.
pub trait ConfigFactory: Send + Sync {
    /// Config kind produced by [`ConfigFactory::build`].
    fn config_kind(&self) -> TypeId;

    /// Registration input key handled by this factory.
    fn key(&self) -> &'static str;

    /// Value of `#` selecting this factory.
    fn selector(&self) -> &str {
        self.key()
    }

    /// Build a config from the feature's input object.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed input.
    fn build(&self, input: &Map<String, Value>) -> Result<BuiltConfig, GatewayError>;
}

/// The active set of factories.
#[derive(Clone, Default)]
pub struct FactoryRegistry {
    factories: Vec<Arc<dyn ConfigFactory>>,
}

impl FactoryRegistry {
    /// Build a registry.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if two factories share a `(key, selector)`
    /// pair.
    pub fn new(factories: Vec<Arc<dyn ConfigFactory>>) -> Result<Self, GatewayError> {
        let mut seen = HashSet::with_capacity(factories.len());
        for factory in &factories {
            if !seen.insert((factory.key(), factory.selector().to_string())) {
                return Err(GatewayError::configuration(format!(
                    "factories for '{}' registered twice under selector '{}'",
                    factory.key(),
                    factory.selector()
                )));
            }
        }
        Ok(Self { factories })
    }

    /// Distinct feature keys in registration order.
    #[must_use]
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = Vec::new();
        for factory in &self.factories {
            if !keys.contains(&factory.key()) {
                keys.push(factory.key());
            }
        }
        keys
    }

    /// Whether any factory handles `key`.
    #[must_use]
    pub fn handles(&self, key: &str) -> bool {
        self.factories.iter().any(|f| f.key() == key)
    }

    /// Factory registered for `(key, selector)`.
    #[must_use]
    pub fn select(&self, key: &str, selector: &str) -> Option<&Arc<dyn ConfigFactory>> {
        self.factories
            .iter()
            .find(|f| f.key() == key && f.selector() == selector)
    }

    /// Build the config for `key` from its input value.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `key` if the input is not an object,
    /// the selector is not a string, no factory matches, or the matched
    /// factory rejects the input.
    pub fn build(&self, key: &str, input: &Value) -> Result<BuiltConfig, GatewayError> {
        self.build_selected(key, input)?.ok_or_else(|| {
            GatewayError::validation(format!("{key}: no factory matches selector"))
        })
    }

    /// Like [`FactoryRegistry::build`], but `Ok(None)` when no factory is
    /// registered under the requested selector.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `key` if the input is not an object,
    /// the selector is not a string, or the matched factory rejects the input.
    pub fn build_selected(
        &self,
        key: &str,
        input: &Value,
    ) -> Result<Option<BuiltConfig>, GatewayError> {
        let Value::Object(fields) = input else {
            return Err(GatewayError::validation(format!("{key}: expected an object")));
        };

        let selector = match fields.get(SELECTOR_FIELD) {
            None => key,
            Some(Value::String(selector)) => selector.as_str(),
            Some(_) => {
                return Err(GatewayError::validation(format!(
                    "{key}: '{SELECTOR_FIELD}' must be a string"
                )));
            }
        };

        match self.select(key, selector) {
            Some(factory) => factory.build(fields).map(Some),
            None => Ok(None),
        }
    }
}

/// Read an optional field into `T`, reporting failures against `key`.
pub(crate) fn parse_input<T: serde::de::DeserializeOwned>(
    key: &str,
    input: &Map<String, Value>,
) -> Result<T, GatewayError> {
    let mut fields = input.clone();
    fields.remove(SELECTOR_FIELD);
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| GatewayError::validation(format!("{key}: {e}")))
}
