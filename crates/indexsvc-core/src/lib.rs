//! # indexsvc-core
//!
//! Core traits and types for the indexing job pipeline.
//!
//! ## Pipeline
//!
//! ```text
//! producer inserts IndexJob row
//!        │
//!        ▼
//! JobQueue::get()  ──── polls ready rows, yields one at a time
//!        │
//!        ▼
//! IndexerCoordinator::index(row)
//!        │  claims the row (JobStore::claim)
//!        │  decodes IndexOp from row.data
//!        │  resolves a DocumentGenerator via the GeneratorRegistry
//!        ▼
//! Indexer::index(op, generator) ──── opens a bulk session against a
//!        │                           pooled IndexClient, drives
//!        │                           create/update/delete
//!        ▼
//! ClaimedJob::finish_success / finish_failure ──── terminal write,
//!                                                   retry scheduling
//! ```
//!
//! ## Key invariants
//!
//! 1. A row is claimed by at most one owner (`JobStore::claim` is the only
//!    compare-and-set).
//! 2. Once a `ClaimedJob` is finished, the row is terminal; it will never be
//!    claimed again.
//! 3. Failures below the claim step are always caught and turned into a
//!    retry decision — a coordinator never panics a worker.
//! 4. Generators yield lazily; nothing is materialized in memory before the
//!    bulk session flushes.

pub mod coordinator;
pub mod error;
pub mod generator;
pub mod index_op;
pub mod indexer;
pub mod job;
pub mod pool;
pub mod queue;
pub mod search;

pub use coordinator::IndexerCoordinator;
pub use error::{IndexSvcError, ValidationError};
pub use generator::{DocumentGenerator, DocumentStream, GeneratedDoc, GeneratorRegistry};
pub use index_op::{IndexAction, IndexOp};
pub use indexer::{Indexer, DEFAULT_AUTOFLUSH};
pub use job::{ClaimedJob, IndexJobRow, JobStore};
pub use pool::{Pool, PoolGuard};
pub use queue::{JobQueue, QueueSignal};
pub use search::{BulkSession, IndexClient};

pub use async_trait::async_trait;
