//! Redis key-value backend.

use super::{KeyStream, KvBackend};
use crate::PlatformError;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

const DEFAULT_SCAN_COUNT: usize = 100;

/// Redis-backed key-value store.
///
/// Connection handling, reconnects and command timeouts belong to the
/// underlying `ConnectionManager`; failures are surfaced, never retried here.
#[derive(Clone)]
pub struct RedisKv {
    conn: ConnectionManager,
    scan_count: usize,
}

impl RedisKv {
    /// Connect to Redis at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the initial connection fails.
    pub async fn connect(url: &str) -> Result<Self, PlatformError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis backend");

        Ok(Self {
            conn,
            scan_count: DEFAULT_SCAN_COUNT,
        })
    }

    /// Set the `COUNT` hint used for `SCAN` pages.
    #[must_use]
    pub const fn with_scan_count(mut self, count: usize) -> Self {
        self.scan_count = count;
        self
    }
}

#[async_trait]
impl KvBackend for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PlatformError> {
        let mut conn = self.conn.clone();
        Ok(conn.get::<_, Option<Vec<u8>>>(key).await?)
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), PlatformError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &[u8]) -> Result<bool, PlatformError> {
        let mut conn = self.conn.clone();
        Ok(conn.set_nx::<_, _, bool>(key, value).await?)
    }

    async fn del(&self, keys: &[String]) -> Result<u64, PlatformError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        Ok(conn.del::<_, u64>(keys.to_vec()).await?)
    }

    async fn exists(&self, key: &str) -> Result<bool, PlatformError> {
        let mut conn = self.conn.clone();
        Ok(conn.exists::<_, bool>(key).await?)
    }

    fn scan<'a>(&'a self, pattern: &str) -> KeyStream<'a> {
        let pattern = pattern.to_string();
        let count = self.scan_count;

        // Cursor-driven SCAN; a cursor of 0 after the first page ends the walk.
        let pages = stream::try_unfold(
            (self.conn.clone(), Some(0_u64)),
            move |(mut conn, cursor)| {
                let pattern = pattern.clone();
                async move {
                    let Some(cursor) = cursor else {
                        return Ok::<_, PlatformError>(None);
                    };
                    let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(count)
                        .query_async(&mut conn)
                        .await
                        .map_err(PlatformError::from)?;
                    let next = (next != 0).then_some(next);
                    Ok::<_, PlatformError>(Some((keys, (conn, next))))
                }
            },
        );

        pages
            .map_ok(|keys| stream::iter(keys.into_iter().map(Ok::<String, PlatformError>)))
            .try_flatten()
            .boxed()
    }
}
