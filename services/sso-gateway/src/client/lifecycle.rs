//! Client lifecycle records: creation, last access and the inactivity index.
//!
//! Each client owns two single-key records in the backend:
//! - `client:<id>` holds the immutable [`ClientRecord`], claimed with an
//!   atomic set-if-absent so id collisions are detected without a lock.
//! - `access:<id>` holds the last-access timestamp and is overwritten by
//!   every touch.

use super::credentials::ClientId;
use crate::clock::Clock;
use crate::error::GatewayError;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use rust_common::KvBackend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const CLIENT_PREFIX: &str = "client:";
const ACCESS_PREFIX: &str = "access:";
const MAX_ID_ATTEMPTS: usize = 8;

/// Persistent part of a client registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Creation time (Unix seconds)
    pub created_at: i64,
    /// Feature keys configured at registration
    pub features: Vec<String>,
}

/// Lifecycle operations over the shared backend.
#[derive(Clone)]
pub struct ClientLifecycle {
    kv: Arc<dyn KvBackend>,
    clock: Arc<dyn Clock>,
}

impl ClientLifecycle {
    /// Create a lifecycle manager.
    pub fn new(kv: Arc<dyn KvBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// Claim a fresh, collision-free client id and record its features.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails, or an internal error if
    /// no free id is found after several attempts.
    #[instrument(skip(self))]
    pub async fn create(&self, features: &[String]) -> Result<ClientId, GatewayError> {
        let now = self.clock.now();
        let record = ClientRecord {
            created_at: now,
            features: features.to_vec(),
        };
        let payload = serde_json::to_vec(&record)?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = ClientId::generate();
            let record = record_key(&id);
            if self.kv.set_if_absent(&record, &payload).await? {
                if let Err(e) = self.kv.set(&access_key(&id), now.to_string().as_bytes()).await {
                    if let Err(cleanup) = self.kv.del(std::slice::from_ref(&record)).await {
                        warn!(client_id = %id, error = %cleanup, "Releasing claimed client id failed");
                    }
                    return Err(e.into());
                }
                debug!(client_id = %id, "Client record created");
                return Ok(id);
            }
            warn!(client_id = %id, "Client id collision, retrying");
        }

        Err(GatewayError::internal("could not allocate a unique client id"))
    }

    /// Read the client record.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails.
    pub async fn record(&self, id: &ClientId) -> Result<Option<ClientRecord>, GatewayError> {
        match self.kv.get(&record_key(id)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Mark the client as used now.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails.
    pub async fn touch(&self, id: &ClientId) -> Result<(), GatewayError> {
        let now = self.clock.now();
        self.kv
            .set(&access_key(id), now.to_string().as_bytes())
            .await?;
        Ok(())
    }

    /// Check whether the client exists, optionally touching it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails.
    pub async fn exists(&self, id: &ClientId, touch: bool) -> Result<bool, GatewayError> {
        let exists = self.kv.exists(&record_key(id)).await?;
        if exists && touch {
            self.touch(id).await?;
        }
        Ok(exists)
    }

    /// Last-access timestamp, falling back to creation time.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails.
    pub async fn last_access(&self, id: &ClientId) -> Result<Option<i64>, GatewayError> {
        if let Some(bytes) = self.kv.get(&access_key(id)).await? {
            if let Some(ts) = parse_timestamp(&bytes) {
                return Ok(Some(ts));
            }
        }
        Ok(self.record(id).await?.map(|record| record.created_at))
    }

    /// Lazily enumerate clients whose last access is older than `threshold`.
    ///
    /// The walk is unordered and may be restarted at any time. Nothing is
    /// deleted; a client touched mid-walk may still be yielded.
    pub fn find_inactive_since(
        &self,
        threshold: i64,
    ) -> BoxStream<'_, Result<ClientId, GatewayError>> {
        self.kv
            .scan(&format!("{CLIENT_PREFIX}*"))
            .map_err(GatewayError::from)
            .try_filter_map(move |key| async move {
                let Some(raw) = key.strip_prefix(CLIENT_PREFIX) else {
                    return Ok(None);
                };
                let Ok(id) = ClientId::parse(raw) else {
                    return Ok(None);
                };
                let last = self.last_access(&id).await?;
                Ok(last.filter(|ts| *ts < threshold).map(|_| id))
            })
            .boxed()
    }

    /// Remove lifecycle records. Returns how many clients existed.
    ///
    /// Feature configs live in their own stores and are not touched here.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn remove(&self, ids: &[ClientId]) -> Result<u64, GatewayError> {
        let records: Vec<String> = ids.iter().map(record_key).collect();
        let access: Vec<String> = ids.iter().map(access_key).collect();

        let removed = self.kv.del(&records).await?;
        self.kv.del(&access).await?;
        Ok(removed)
    }

    /// Backend keys owned by the lifecycle for this client.
    #[must_use]
    pub fn keys_for(id: &ClientId) -> [String; 2] {
        [record_key(id), access_key(id)]
    }
}

fn record_key(id: &ClientId) -> String {
    format!("{CLIENT_PREFIX}{id}")
}

fn access_key(id: &ClientId) -> String {
    format!("{ACCESS_PREFIX}{id}")
}

fn parse_timestamp(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}
