//! Error taxonomy for the indexing pipeline.

use thiserror::Error;

/// Errors raised while claiming, decoding, or executing an `IndexJob`.
///
/// Every variant below `JobOwned` is something the coordinator catches,
/// logs, and turns into a scheduled retry; `JobOwned` itself is not a
/// failure, it means a sibling replica won the claim race first.
#[derive(Debug, Error)]
pub enum IndexSvcError {
    /// Input failed validation at job submission. User-visible.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Another claimer already owns this row; abandon it without touching it further.
    #[error("job already claimed by another owner")]
    JobOwned,

    /// `IndexJob.data` did not decode into an `IndexOp`.
    #[error("failed to decode job payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// No indexer/generator is registered for (name, type).
    #[error("unsupported index target: ({name}, {doc_type})")]
    UnsupportedTarget { name: String, doc_type: String },

    /// The document generator failed to read from the relational store.
    #[error("document generation failed: {0}")]
    Generator(#[source] anyhow::Error),

    /// The bulk session reported a non-empty error list after an operation.
    #[error("search backend reported an error: {0}")]
    Backend(String),

    /// Pool checkout failed (e.g. during shutdown) or the pool timed out.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),
}

impl IndexSvcError {
    /// Whether a failure in this variant should cause a retry job to be
    /// scheduled. Everything at and below the coordinator is retried; only
    /// `JobOwned` and `Validation` are not job failures.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, IndexSvcError::JobOwned | IndexSvcError::Validation(_))
    }
}

/// Validation error surfaced to RPC callers.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("context must not be empty")]
    EmptyContext,
    #[error("unsupported index action")]
    UnsupportedAction,
    #[error("index name must not be empty")]
    EmptyName,
    #[error("document type must not be empty")]
    EmptyType,
    #[error("keys must not be empty unless indexing all keys")]
    EmptyKeys,
}
