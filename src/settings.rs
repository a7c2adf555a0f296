//! Environment-variable configuration.
//!
//! Every knob has the same default as the system this service replaces, so
//! an operator who sets nothing gets the same behavior: one worker thread,
//! one-item pools, a minute between polls, a five-minute retry delay, and
//! three retry attempts.

use std::env;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Runtime configuration for the `indexsvc` binary.
#[derive(Debug, Clone)]
pub struct Settings {
    /// `DATABASE_URL` — Postgres connection string backing the job queue.
    pub database_url: String,
    /// `ES_ENDPOINT` — base URL of the search backend's `_bulk` endpoint.
    pub es_endpoint: String,
    /// `RPC_ADDR` — address the admin/ingest HTTP surface binds to.
    pub rpc_addr: String,

    /// `INDEXER_THREADS` — number of concurrent worker tasks draining the queue.
    pub indexer_threads: usize,
    /// `INDEXER_POOL_SIZE` — size of the `IndexerCoordinator` pool.
    pub indexer_pool_size: usize,
    /// `INDEXER_POLL_SECONDS` — delay between empty-queue polls.
    pub indexer_poll_interval: Duration,
    /// `INDEXER_JOB_RETRY_SECONDS` — delay added before a retried job's `not_before`.
    pub indexer_job_retry_delay: chrono::Duration,
    /// `INDEXER_JOB_MAX_RETRY_ATTEMPTS` — `retries_remaining` given to freshly inserted jobs.
    pub indexer_job_max_retry_attempts: i32,

    /// `ES_POOL_SIZE` — size of the `IndexClient` pool.
    pub es_pool_size: usize,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            es_endpoint: env::var("ES_ENDPOINT").unwrap_or_else(|_| "http://localhost:9200".into()),
            rpc_addr: env::var("RPC_ADDR").unwrap_or_else(|_| "0.0.0.0:9096".into()),

            indexer_threads: env_or("INDEXER_THREADS", 1),
            indexer_pool_size: env_or("INDEXER_POOL_SIZE", 1),
            indexer_poll_interval: Duration::from_secs(env_or("INDEXER_POLL_SECONDS", 60)),
            indexer_job_retry_delay: chrono::Duration::seconds(env_or("INDEXER_JOB_RETRY_SECONDS", 300)),
            indexer_job_max_retry_attempts: env_or("INDEXER_JOB_MAX_RETRY_ATTEMPTS", 3),

            es_pool_size: env_or("ES_POOL_SIZE", 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_missing_or_unparseable_value() {
        assert_eq!(env_or::<usize>("INDEXSVC_TEST_DOES_NOT_EXIST", 7), 7);
    }
}
