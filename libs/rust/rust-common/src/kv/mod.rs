//! Key-value backend abstraction.
//!
//! The gateway keeps all of its state in one shared key-value store. Every
//! operation here is a single-key (or single-command) round trip, so callers
//! never hold a lock across two network calls.

mod memory;
mod redis;

pub use self::memory::MemoryKv;
pub use self::redis::RedisKv;

use crate::PlatformError;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Lazy, restartable sequence of keys produced by [`KvBackend::scan`].
pub type KeyStream<'a> = BoxStream<'a, Result<String, PlatformError>>;

/// Key-value backend client.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PlatformError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), PlatformError>;

    /// Write a value only if the key is absent. Returns `true` when written.
    async fn set_if_absent(&self, key: &str, value: &[u8]) -> Result<bool, PlatformError>;

    /// Delete keys, returning how many actually existed.
    async fn del(&self, keys: &[String]) -> Result<u64, PlatformError>;

    /// Check whether a key is present.
    async fn exists(&self, key: &str) -> Result<bool, PlatformError>;

    /// Enumerate keys matching a glob pattern (`*` wildcard). Unordered.
    fn scan<'a>(&'a self, pattern: &str) -> KeyStream<'a>;
}

/// Match `key` against a glob pattern where `*` matches any run of characters.
pub(crate) fn glob_match(pattern: &str, key: &str) -> bool {
    let mut segments = pattern.split('*');
    let head = segments.next().unwrap_or_default();
    let Some(mut rest) = key.strip_prefix(head) else {
        return false;
    };

    let segments: Vec<&str> = segments.collect();
    let Some((last, middle)) = segments.split_last() else {
        return rest.is_empty();
    };

    for segment in middle {
        match rest.find(segment) {
            Some(idx) => rest = &rest[idx + segment.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
