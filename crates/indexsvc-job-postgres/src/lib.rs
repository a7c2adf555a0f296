//! PostgreSQL implementation of the indexsvc durable job queue.
//!
//! This is the only production [`JobStore`] implementation: it backs the
//! `index_jobs` table with one compare-and-set `UPDATE` per claim and plain
//! row inserts for retries.
//!
//! # Database Schema
//!
//! See `migrations/0001_index_jobs.sql`. Summarized:
//!
//! ```sql
//! CREATE TABLE index_jobs (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     context TEXT NOT NULL,
//!     data JSONB NOT NULL,
//!     created TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     not_before TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     retries_remaining INTEGER NOT NULL,
//!     owner TEXT,
//!     "start" TIMESTAMPTZ,
//!     "end" TIMESTAMPTZ,
//!     successful BOOLEAN
//! );
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use indexsvc_job_postgres::PgIndexJobStore;
//! use sqlx::PgPool;
//!
//! let pool = PgPool::connect("postgres://localhost/indexsvc").await?;
//! let store = PgIndexJobStore::new(pool);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use indexsvc_core::job::{IndexJobRow, JobStore};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// PostgreSQL-backed [`JobStore`].
#[derive(Clone)]
pub struct PgIndexJobStore {
    pool: PgPool,
}

impl PgIndexJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded migrations. Call once at process start.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn row_to_index_job(row: sqlx::postgres::PgRow) -> IndexJobRow {
    IndexJobRow {
        id: row.get("id"),
        context: row.get("context"),
        data: row.get("data"),
        created: row.get("created"),
        not_before: row.get("not_before"),
        retries_remaining: row.get("retries_remaining"),
        owner: row.get("owner"),
        start: row.get("start"),
        end: row.get("end"),
        successful: row.get("successful"),
    }
}

#[async_trait]
impl JobStore for PgIndexJobStore {
    /// Insert a brand new job row.
    async fn insert(
        &self,
        context: &str,
        data: serde_json::Value,
        not_before: DateTime<Utc>,
        retries_remaining: i32,
    ) -> anyhow::Result<Uuid> {
        let row = sqlx::query(
            r#"
            INSERT INTO index_jobs (context, data, created, not_before, retries_remaining)
            VALUES ($1, $2, NOW(), $3, $4)
            RETURNING id
            "#,
        )
        .bind(context)
        .bind(&data)
        .bind(not_before)
        .bind(retries_remaining)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    /// Select candidate rows, ordered by `not_before` so the longest-waiting
    /// job goes out first. Does not claim them — claiming is a separate,
    /// narrower compare-and-set.
    async fn poll_ready(&self, limit: i64) -> anyhow::Result<Vec<IndexJobRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, context, data, created, not_before, retries_remaining,
                   owner, "start", "end", successful
            FROM index_jobs
            WHERE owner IS NULL
              AND successful IS NULL
              AND not_before <= NOW()
            ORDER BY not_before ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_index_job).collect())
    }

    /// Atomic compare-and-set claim: exactly one caller can ever win this
    /// `UPDATE` for a given row.
    async fn claim(&self, id: Uuid, owner: &str) -> anyhow::Result<Option<IndexJobRow>> {
        let row = sqlx::query(
            r#"
            UPDATE index_jobs
            SET owner = $2, "start" = NOW()
            WHERE id = $1 AND owner IS NULL
            RETURNING id, context, data, created, not_before, retries_remaining,
                      owner, "start", "end", successful
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_index_job))
    }

    async fn mark_succeeded(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"UPDATE index_jobs SET successful = TRUE, "end" = NOW() WHERE id = $1"#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"UPDATE index_jobs SET successful = FALSE, "end" = NOW() WHERE id = $1"#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a successor row with `retries_remaining - 1`.
    async fn insert_retry(&self, failed: &IndexJobRow, retry_delay: Duration) -> anyhow::Result<Uuid> {
        let not_before = Utc::now() + retry_delay;
        self.insert(
            &failed.context,
            failed.data.clone(),
            not_before,
            failed.retries_remaining - 1,
        )
        .await
    }
}

/// Housekeeping queries outside the [`JobStore`] contract — not wired into
/// the main pipeline. There is no abandoned-claim reaper; an operator runs
/// this manually or schedules it separately.
impl PgIndexJobStore {
    /// Count rows by terminal state, for operational dashboards.
    pub async fn stats(&self) -> anyhow::Result<IndexJobStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE owner IS NULL AND successful IS NULL) AS pending,
                COUNT(*) FILTER (WHERE owner IS NOT NULL AND successful IS NULL) AS running,
                COUNT(*) FILTER (WHERE successful = TRUE) AS succeeded,
                COUNT(*) FILTER (WHERE successful = FALSE) AS failed
            FROM index_jobs
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(IndexJobStats {
            pending: row.get("pending"),
            running: row.get("running"),
            succeeded: row.get("succeeded"),
            failed: row.get("failed"),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndexJobStats {
    pub pending: i64,
    pub running: i64,
    pub succeeded: i64,
    pub failed: i64,
}
