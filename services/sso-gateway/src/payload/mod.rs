//! Token payload assembly.

pub mod claims;
pub mod composer;
pub mod extension;

pub use claims::extract_claims;
pub use composer::PayloadComposer;
pub use extension::{ClaimsContext, ClaimsExtension, Extensions};

use serde_json::Value;
use std::collections::HashMap;

/// Ordered claim set. Insertion order is kept in the serialized token.
pub type Claims = serde_json::Map<String, Value>;

/// Multi-valued attributes of the authenticated session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionAttributes {
    values: HashMap<String, Vec<Value>>,
}

impl SessionAttributes {
    /// Empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the values of `name`, replacing earlier ones.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<Value>) {
        self.values.insert(name.into(), values);
    }

    /// Builder form of [`SessionAttributes::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.insert(name, values);
        self
    }

    /// Values of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<Value>)> for SessionAttributes {
    fn from_iter<I: IntoIterator<Item = (K, Vec<Value>)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
