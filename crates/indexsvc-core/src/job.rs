//! The durable, leased job queue abstraction.
//!
//! [`JobStore`] is the trait a concrete backend (Postgres, in-memory test
//! double) implements; [`ClaimedJob`] is the "job scope" — entering it is
//! the claim, finishing it is the one and only way to make the row terminal.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// One `IndexJob` row.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexJobRow {
    pub id: Uuid,
    pub context: String,
    pub data: serde_json::Value,
    pub created: DateTime<Utc>,
    pub not_before: DateTime<Utc>,
    pub retries_remaining: i32,
    pub owner: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub successful: Option<bool>,
}

/// Durable job storage. Implementations own the atomic compare-and-set that
/// makes claiming exactly-one-owner.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Insert a brand new job row (used by the RPC surface and the CLI
    /// scheduler).
    async fn insert(
        &self,
        context: &str,
        data: serde_json::Value,
        not_before: DateTime<Utc>,
        retries_remaining: i32,
    ) -> anyhow::Result<Uuid>;

    /// Select up to `limit` claimable rows (owner IS NULL AND successful IS
    /// NULL AND not_before <= now), ordered by not_before ascending so the
    /// oldest ready work goes out first. Does not claim them.
    async fn poll_ready(&self, limit: i64) -> anyhow::Result<Vec<IndexJobRow>>;

    /// Atomically claim one row by id: `UPDATE ... WHERE id = ? AND owner IS
    /// NULL RETURNING *`. `Ok(None)` means the compare-and-set affected zero
    /// rows — another claimer got there first.
    async fn claim(&self, id: Uuid, owner: &str) -> anyhow::Result<Option<IndexJobRow>>;

    /// Mark a claimed row terminal-success.
    async fn mark_succeeded(&self, id: Uuid) -> anyhow::Result<()>;

    /// Mark a claimed row terminal-failure. Does not insert a successor;
    /// that is a separate call so the decision to retry stays with the
    /// coordinator.
    async fn mark_failed(&self, id: Uuid) -> anyhow::Result<()>;

    /// Insert a successor row for a failed job with `retries_remaining - 1`
    /// and `not_before = now + retry_delay`, copying `data`/`context`.
    async fn insert_retry(&self, failed: &IndexJobRow, retry_delay: Duration) -> anyhow::Result<Uuid>;
}

/// A claimed row together with the store that owns it. Entering a job
/// (claiming it) happens before this value exists; exiting the scope is an
/// explicit call to [`ClaimedJob::finish_success`] or
/// [`ClaimedJob::finish_failure`] — never both, never neither. Re-entering a
/// finished `ClaimedJob` is not possible since both consume `self`.
pub struct ClaimedJob {
    pub row: IndexJobRow,
    store: Arc<dyn JobStore>,
    finished: bool,
}

impl ClaimedJob {
    pub fn new(row: IndexJobRow, store: Arc<dyn JobStore>) -> Self {
        Self {
            row,
            store,
            finished: false,
        }
    }

    /// Exit the scope normally: mark the row terminal-success.
    pub async fn finish_success(mut self) -> anyhow::Result<()> {
        self.store.mark_succeeded(self.row.id).await?;
        self.finished = true;
        Ok(())
    }

    /// Exit the scope on failure: mark the row terminal-failure and, if
    /// `retries_remaining > 0`, schedule a successor. Failures while
    /// scheduling the retry are logged, not propagated — the original row is
    /// already terminal regardless.
    pub async fn finish_failure(mut self, retry_delay: Duration) -> anyhow::Result<()> {
        self.store.mark_failed(self.row.id).await?;
        self.finished = true;

        if self.row.retries_remaining > 0 {
            if let Err(err) = self.store.insert_retry(&self.row, retry_delay).await {
                tracing::error!(job_id = %self.row.id, error = %err, "failed to schedule retry job");
            }
        } else {
            tracing::error!(job_id = %self.row.id, "job permanently failed, no retries remaining");
        }

        Ok(())
    }
}

impl Drop for ClaimedJob {
    fn drop(&mut self) {
        if !self.finished {
            tracing::error!(
                job_id = %self.row.id,
                "ClaimedJob dropped without finish_success/finish_failure; row remains owned \
                 and will not be retried by this process"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Calls {
        succeeded: Vec<Uuid>,
        failed: Vec<Uuid>,
        retries: Vec<(Uuid, i32)>,
    }

    struct FakeStore {
        calls: Mutex<Calls>,
    }

    #[async_trait]
    impl JobStore for FakeStore {
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
            Ok(vec![])
        }

        async fn claim(&self, _id: Uuid, _owner: &str) -> anyhow::Result<Option<IndexJobRow>> {
            Ok(None)
        }

        async fn mark_succeeded(&self, id: Uuid) -> anyhow::Result<()> {
            self.calls.lock().unwrap().succeeded.push(id);
            Ok(())
        }

        async fn mark_failed(&self, id: Uuid) -> anyhow::Result<()> {
            self.calls.lock().unwrap().failed.push(id);
            Ok(())
        }

        async fn insert_retry(&self, failed: &IndexJobRow, _retry_delay: Duration) -> anyhow::Result<Uuid> {
            self.calls
                .lock()
                .unwrap()
                .retries
                .push((failed.id, failed.retries_remaining - 1));
            Ok(Uuid::new_v4())
        }
    }

    fn sample_row(retries_remaining: i32) -> IndexJobRow {
        IndexJobRow {
            id: Uuid::new_v4(),
            context: "t".into(),
            data: serde_json::json!({}),
            created: Utc::now(),
            not_before: Utc::now(),
            retries_remaining,
            owner: Some("w1".into()),
            start: Some(Utc::now()),
            end: None,
            successful: None,
        }
    }

    #[tokio::test]
    async fn finish_success_marks_succeeded_only() {
        let store = Arc::new(FakeStore { calls: Mutex::new(Calls::default()) });
        let row = sample_row(3);
        let id = row.id;
        let job = ClaimedJob::new(row, store.clone());
        job.finish_success().await.unwrap();

        let calls = store.calls.lock().unwrap();
        assert_eq!(calls.succeeded, vec![id]);
        assert!(calls.failed.is_empty());
        assert!(calls.retries.is_empty());
    }

    #[tokio::test]
    async fn finish_failure_schedules_retry_when_attempts_remain() {
        let store = Arc::new(FakeStore { calls: Mutex::new(Calls::default()) });
        let row = sample_row(2);
        let id = row.id;
        let job = ClaimedJob::new(row, store.clone());
        job.finish_failure(Duration::seconds(60)).await.unwrap();

        let calls = store.calls.lock().unwrap();
        assert_eq!(calls.failed, vec![id]);
        assert_eq!(calls.retries, vec![(id, 1)]);
    }

    #[tokio::test]
    async fn finish_failure_does_not_retry_at_zero_remaining() {
        let store = Arc::new(FakeStore { calls: Mutex::new(Calls::default()) });
        let row = sample_row(0);
        let job = ClaimedJob::new(row, store.clone());
        job.finish_failure(Duration::seconds(60)).await.unwrap();

        let calls = store.calls.lock().unwrap();
        assert_eq!(calls.failed.len(), 1);
        assert!(calls.retries.is_empty());
    }
}
