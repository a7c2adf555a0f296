//! The search backend contract: a pooled client that can open a bulk index
//! session. The wire format talking to the actual backend is deliberately
//! not specified here — only this contract is, so a different backend is a
//! new `IndexClient` impl and nothing else changes.

use async_trait::async_trait;

/// A client capable of opening a bulk indexing session against one
/// (index name, document type) pair.
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Open a bulk session that auto-flushes every `autoflush` buffered
    /// operations.
    async fn open_bulk_session(
        &self,
        name: &str,
        doc_type: &str,
        autoflush: usize,
    ) -> anyhow::Result<Box<dyn BulkSession>>;
}

/// A scoped batching handle against the search backend. Accumulates
/// put/delete operations, auto-flushing at the configured threshold; the
/// caller must call [`BulkSession::flush`] on every exit path to flush
/// remaining buffered operations.
#[async_trait]
pub trait BulkSession: Send {
    /// Buffer (or immediately issue, if already over threshold) an index
    /// write. `create = true` rejects if the key already exists; `create =
    /// false` upserts.
    async fn put(&mut self, key: &str, doc: serde_json::Value, create: bool) -> anyhow::Result<()>;

    /// Buffer a delete of `key`.
    async fn delete(&mut self, key: &str) -> anyhow::Result<()>;

    /// Errors accumulated so far. The caller inspects this after every
    /// put/delete; any entry means the session has hit a backend error.
    fn errors(&self) -> &[String];

    /// Flush any buffered operations. Idempotent; safe to call as the final
    /// step even if an auto-flush already ran.
    async fn flush(&mut self) -> anyhow::Result<()>;
}
