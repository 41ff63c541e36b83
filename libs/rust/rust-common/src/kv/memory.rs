//! In-process key-value backend.
//!
//! Used for development and tests. Semantics follow the Redis backend: a
//! single write lock per command, nothing held across calls.

use super::{KeyStream, KvBackend, glob_match};
use crate::PlatformError;
use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory key-value backend.
#[derive(Clone, Default)]
pub struct MemoryKv {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryKv {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the backend holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PlatformError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), PlatformError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &[u8]) -> Result<bool, PlatformError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    async fn del(&self, keys: &[String]) -> Result<u64, PlatformError> {
        let mut entries = self.entries.write().await;
        let removed = keys.iter().filter(|k| entries.remove(*k).is_some()).count();
        Ok(removed as u64)
    }

    async fn exists(&self, key: &str) -> Result<bool, PlatformError> {
        Ok(self.entries.read().await.contains_key(key))
    }

    fn scan<'a>(&'a self, pattern: &str) -> KeyStream<'a> {
        let pattern = pattern.to_string();
        stream::once(async move {
            let entries = self.entries.read().await;
            let matched: Vec<Result<String, PlatformError>> = entries
                .keys()
                .filter(|key| glob_match(&pattern, key))
                .cloned()
                .map(Ok)
                .collect();
            stream::iter(matched)
        })
        .flatten()
        .boxed()
    }
}
