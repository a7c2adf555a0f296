//! Polling front-end over a [`JobStore`]: buffers ready-but-unclaimed rows
//! and yields them one at a time. Claiming itself happens later, when the
//! coordinator enters the job's scope — this type only decides *which* row
//! to hand out next.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::job::{IndexJobRow, JobStore};

/// Result of one [`JobQueue::get`] call.
pub enum QueueSignal {
    Job(IndexJobRow),
    /// No job was ready within one poll interval.
    Empty,
    /// `stop()` was called; no more jobs will be produced.
    Stopped,
}

/// The durable job stream. Generic over any [`JobStore`] backend.
pub struct JobQueue<S: JobStore> {
    store: Arc<S>,
    poll_interval: StdDuration,
    candidates_per_tick: i64,
    tx: mpsc::Sender<IndexJobRow>,
    rx: tokio::sync::Mutex<mpsc::Receiver<IndexJobRow>>,
    stopped: Arc<AtomicBool>,
    stop_notify: Arc<Notify>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: JobStore> JobQueue<S> {
    pub fn new(store: Arc<S>, poll_interval: StdDuration, candidates_per_tick: i64) -> Self {
        let (tx, rx) = mpsc::channel(candidates_per_tick.max(1) as usize);
        Self {
            store,
            poll_interval,
            candidates_per_tick,
            tx,
            rx: tokio::sync::Mutex::new(rx),
            stopped: Arc::new(AtomicBool::new(false)),
            stop_notify: Arc::new(Notify::new()),
            poll_task: Mutex::new(None),
        }
    }

    /// Begin polling. Idempotent; calling `start()` again before a prior
    /// `stop()` has completed is a programming error and is logged rather
    /// than silently accepted twice.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.poll_task.lock().expect("poll_task mutex poisoned");
        if slot.is_some() {
            tracing::warn!("JobQueue::start called while already running");
            return;
        }
        self.stopped.store(false, Ordering::SeqCst);

        let this = self.clone();
        *slot = Some(tokio::spawn(async move { this.poll_loop().await }));
    }

    async fn poll_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = self.stop_notify.notified() => break,
            }
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }

            match self.store.poll_ready(self.candidates_per_tick).await {
                Ok(rows) => {
                    for row in rows {
                        if self.tx.send(row).await.is_err() {
                            return;
                        }
                    }
                }
                Err(err) => tracing::error!(error = %err, "job queue poll failed"),
            }
        }
    }

    /// Block up to one poll interval for the next ready job.
    pub async fn get(&self) -> QueueSignal {
        if self.stopped.load(Ordering::SeqCst) {
            return QueueSignal::Stopped;
        }

        let mut rx = self.rx.lock().await;
        tokio::select! {
            item = rx.recv() => match item {
                Some(row) => QueueSignal::Job(row),
                None => QueueSignal::Stopped,
            },
            _ = tokio::time::sleep(self.poll_interval) => QueueSignal::Empty,
            _ = self.stop_notify.notified() => QueueSignal::Stopped,
        }
    }

    /// Signal shutdown; unblocks any in-flight `get()`. Does not roll back
    /// an in-flight claim — a job already handed to a coordinator runs to
    /// completion.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_notify.notify_waiters();
        if let Some(handle) = self.poll_task.lock().expect("poll_task mutex poisoned").take() {
            handle.abort();
        }
    }

    pub fn store(&self) -> Arc<S> {
        self.store.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::atomic::AtomicUsize;
    use uuid::Uuid;

    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JobStore for CountingStore {
        async fn insert(
            &self,
            _context: &str,
            _data: serde_json::Value,
            _not_before: DateTime<Utc>,
            _retries_remaining: i32,
        ) -> anyhow::Result<Uuid> {
            Ok(Uuid::new_v4())
        }

        async fn poll_ready(&self, _limit: i64) -> anyhow::Result<Vec<IndexJobRow>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Ok(vec![IndexJobRow {
                    id: Uuid::new_v4(),
                    context: "t".into(),
                    data: serde_json::json!({}),
                    created: Utc::now(),
                    not_before: Utc::now(),
                    retries_remaining: 3,
                    owner: None,
                    start: None,
                    end: None,
                    successful: None,
                }])
            } else {
                Ok(vec![])
            }
        }

        async fn claim(&self, _id: Uuid, _owner: &str) -> anyhow::Result<Option<IndexJobRow>> {
            Ok(None)
        }
        async fn mark_succeeded(&self, _id: Uuid) -> anyhow::Result<()> {
            Ok(())
        }
        async fn mark_failed(&self, _id: Uuid) -> anyhow::Result<()> {
            Ok(())
        }
        async fn insert_retry(&self, _failed: &IndexJobRow, _retry_delay: Duration) -> anyhow::Result<Uuid> {
            Ok(Uuid::new_v4())
        }
    }

    #[tokio::test]
    async fn yields_ready_job_then_empty_then_stopped() {
        let store = Arc::new(CountingStore { calls: AtomicUsize::new(0) });
        let queue = Arc::new(JobQueue::new(store, StdDuration::from_millis(20), 10));
        queue.start();

        match queue.get().await {
            QueueSignal::Job(_) => {}
            _ => panic!("expected a job"),
        }

        match queue.get().await {
            QueueSignal::Empty => {}
            _ => panic!("expected empty"),
        }

        queue.stop();
        match queue.get().await {
            QueueSignal::Stopped => {}
            _ => panic!("expected stopped"),
        }
    }
}
