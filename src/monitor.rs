//! Single monitor loop bridging the durable queue and the worker pool.
//!
//! Polls [`JobQueue::get`] and forwards ready rows onto a bounded channel
//! that [`crate::thread_pool::IndexThreadPool`] workers drain. The channel's
//! bound is the backpressure: when every worker is busy, the send blocks and
//! monitoring itself slows down, which is the intended behavior rather than
//! an unbounded queue building up in memory.

use std::sync::Arc;

use indexsvc_core::{IndexJobRow, JobQueue, JobStore, QueueSignal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct IndexJobMonitor {
    handle: Option<JoinHandle<()>>,
}

impl IndexJobMonitor {
    /// Spawn the monitor loop. Returns the monitor handle and the receiving
    /// end of the hand-off channel for the thread pool to drain.
    pub fn start<S: JobStore>(
        queue: Arc<JobQueue<S>>,
        channel_capacity: usize,
    ) -> (Self, mpsc::Receiver<IndexJobRow>) {
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));

        let handle = tokio::spawn(async move {
            loop {
                match queue.get().await {
                    QueueSignal::Job(row) => {
                        // Blocking send is the backpressure point: a full
                        // channel means workers are saturated, so the
                        // monitor itself slows down rather than buffering.
                        if tx.send(row).await.is_err() {
                            tracing::info!("monitor stopping: hand-off channel closed by receivers");
                            return;
                        }
                    }
                    QueueSignal::Empty => continue,
                    QueueSignal::Stopped => {
                        tracing::info!("monitor stopping: queue signaled stopped");
                        return;
                    }
                }
            }
        });

        (Self { handle: Some(handle) }, rx)
    }

    /// Wait for the monitor loop to exit, e.g. after `JobQueue::stop()`.
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "monitor task panicked");
            }
        }
    }
}
