//! Fixed worker-task pool draining the monitor's hand-off channel.
//!
//! Each worker blocks on the internal job channel; on receipt it borrows an
//! [`IndexerCoordinator`] from the bounded coordinator pool (scoped
//! acquisition, guaranteed release on every exit path) and calls
//! `coordinator.index(job)`. A worker never exits on a single bad job —
//! `IndexerCoordinator::index` already swallows everything below the claim
//! step, so "one poisoned job kills one job, never the process".

use std::sync::Arc;

use indexsvc_core::{IndexJobRow, IndexerCoordinator, Pool};
use tokio::sync::{mpsc, Mutex};

/// Runs `threads` worker tasks until the hand-off channel closes.
pub struct IndexThreadPool {
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl IndexThreadPool {
    pub fn start(
        threads: usize,
        rx: mpsc::Receiver<IndexJobRow>,
        coordinators: Arc<Pool<IndexerCoordinator>>,
    ) -> Self {
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..threads.max(1))
            .map(|i| {
                let rx = rx.clone();
                let coordinators = coordinators.clone();
                let owner = format!("indexsvc-worker-{i}");
                tokio::spawn(async move { worker_loop(owner, rx, coordinators).await })
            })
            .collect();

        Self { workers }
    }

    /// Wait for every worker to exit (happens once the hand-off channel closes).
    pub async fn join(self) {
        for worker in self.workers {
            if let Err(err) = worker.await {
                tracing::error!(error = %err, "index worker task panicked");
            }
        }
    }
}

async fn worker_loop(
    owner: String,
    rx: Arc<Mutex<mpsc::Receiver<IndexJobRow>>>,
    coordinators: Arc<Pool<IndexerCoordinator>>,
) {
    loop {
        let row = match rx.lock().await.recv().await {
            Some(row) => row,
            None => {
                tracing::info!(owner, "worker stopping: hand-off channel closed");
                return;
            }
        };

        let coordinator = match coordinators.checkout().await {
            Ok(guard) => guard,
            Err(err) => {
                tracing::error!(error = %err, job_id = %row.id, "failed to check out a coordinator, dropping job for this tick");
                continue;
            }
        };
        coordinator.index(row, &owner).await;
    }
}
