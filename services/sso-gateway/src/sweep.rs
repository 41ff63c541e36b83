//! Inactive client detection and explicit purging.
//!
//! Listing never deletes. An operator reviews the candidates and then purges
//! them; a client touched between the two steps is still purged.

use crate::client::{ClientId, ClientLifecycle};
use crate::clock::Clock;
use crate::error::GatewayError;
use crate::registration::{ClientRemover, RemovalReport};
use futures::TryStreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Finds clients idle longer than the retention period.
#[derive(Clone)]
pub struct InactiveSweep {
    lifecycle: ClientLifecycle,
    remover: ClientRemover,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl InactiveSweep {
    /// Create a sweep.
    pub fn new(
        lifecycle: ClientLifecycle,
        remover: ClientRemover,
        clock: Arc<dyn Clock>,
        retention: Duration,
    ) -> Self {
        Self {
            lifecycle,
            remover,
            clock,
            retention,
        }
    }

    /// Last-access cutoff: clients used before this instant are candidates.
    #[must_use]
    pub fn threshold(&self) -> i64 {
        let retention = i64::try_from(self.retention.as_secs()).unwrap_or(i64::MAX);
        self.clock.now().saturating_sub(retention)
    }

    /// Lazily stream candidates. Restartable and unordered.
    pub fn candidate_stream(&self) -> BoxStream<'_, Result<ClientId, GatewayError>> {
        self.lifecycle.find_inactive_since(self.threshold())
    }

    /// Collect all current candidates.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    #[instrument(skip(self))]
    pub async fn candidates(&self) -> Result<Vec<ClientId>, GatewayError> {
        let mut ids: Vec<ClientId> = self.candidate_stream().try_collect().await?;
        ids.sort();
        info!(count = ids.len(), "Inactive clients found");
        Ok(ids)
    }

    /// Remove the given clients everywhere.
    pub async fn purge(&self, ids: &[ClientId]) -> RemovalReport {
        self.remover.remove(ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::ConfigRetriever;
    use rust_common::MemoryKv;

    const DAY: i64 = 86_400;

    #[tokio::test]
    async fn test_candidates_and_purge() {
        let kv = Arc::new(MemoryKv::new());
        let clock = Arc::new(FixedClock::new(0));
        let lifecycle = ClientLifecycle::new(kv.clone(), clock.clone());
        let remover = ClientRemover::new(lifecycle.clone(), ConfigRetriever::new(Vec::new()).unwrap());
        let sweep = InactiveSweep::new(
            lifecycle.clone(),
            remover,
            clock.clone(),
            Duration::from_secs(30 * 86_400),
        );

        let idle = lifecycle.create(&[]).await.unwrap();
        clock.set(20 * DAY);
        let active = lifecycle.create(&[]).await.unwrap();
        clock.set(40 * DAY);

        assert_eq!(sweep.threshold(), 10 * DAY);
        let candidates = sweep.candidates().await.unwrap();
        assert_eq!(candidates, vec![idle.clone()]);

        let report = sweep.purge(&candidates).await;
        assert_eq!(report.clients, 1);
        assert!(!lifecycle.exists(&idle, false).await.unwrap());
        assert!(lifecycle.exists(&active, false).await.unwrap());
    }
}
