//! The per-job driver: decode, resolve, index, retry-on-failure.

use std::sync::Arc;

use chrono::Duration;

use crate::generator::GeneratorRegistry;
use crate::index_op::IndexOp;
use crate::indexer::Indexer;
use crate::job::{ClaimedJob, IndexJobRow, JobStore};

pub struct IndexerCoordinator {
    store: Arc<dyn JobStore>,
    registry: Arc<GeneratorRegistry>,
    indexer: Arc<Indexer>,
    retry_delay: Duration,
}

impl IndexerCoordinator {
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<GeneratorRegistry>,
        indexer: Arc<Indexer>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            indexer,
            retry_delay,
        }
    }

    /// Process one candidate row end to end: claim, decode, resolve, index.
    /// Never propagates an error out of itself — every failure path below
    /// claim is caught, logged, and turned into a retry decision, so one
    /// poisoned job never kills its worker.
    pub async fn index(&self, candidate: IndexJobRow, owner: &str) {
        let claimed = match self.store.claim(candidate.id, owner).await {
            Ok(Some(row)) => ClaimedJob::new(row, self.store.clone()),
            Ok(None) => {
                tracing::warn!(job_id = %candidate.id, "job already claimed by another owner, skipping");
                return;
            }
            Err(err) => {
                tracing::error!(job_id = %candidate.id, error = %err, "failed to claim job");
                return;
            }
        };

        let op = match IndexOp::decode(&claimed.row.data) {
            Ok(op) => op,
            Err(err) => {
                tracing::error!(job_id = %claimed.row.id, error = %err, "failed to decode job payload");
                if let Err(err) = claimed.finish_failure(self.retry_delay).await {
                    tracing::error!(error = %err, "failed to finalize job after decode error");
                }
                return;
            }
        };

        let generator = match self.registry.resolve(&op.name, &op.doc_type) {
            Some(generator) => generator,
            None => {
                tracing::error!(
                    job_id = %claimed.row.id,
                    name = %op.name,
                    doc_type = %op.doc_type,
                    "unsupported index target"
                );
                if let Err(err) = claimed.finish_failure(self.retry_delay).await {
                    tracing::error!(error = %err, "failed to finalize job after unsupported target");
                }
                return;
            }
        };

        match self.indexer.index(&op, generator).await {
            Ok(count) => {
                tracing::info!(job_id = %claimed.row.id, count, "index job completed successfully");
                if let Err(err) = claimed.finish_success().await {
                    tracing::error!(job_id_hint = %op.name, error = %err, "failed to mark job succeeded");
                }
            }
            Err(err) => {
                tracing::error!(job_id = %claimed.row.id, error = %err, "index job failed");
                if let Err(err) = claimed.finish_failure(self.retry_delay).await {
                    tracing::error!(error = %err, "failed to finalize job after indexing error");
                }
            }
        }
    }
}
