//! Document generators: per-(index name, document type) strategies that
//! read the relational store and emit indexable documents.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

/// One `(key, document)` pair, or a per-item failure. Per-item failures
/// inside a generator should surface as `Err` so the job retries rather than
/// silently skipping the document.
pub type GeneratedDoc = anyhow::Result<(String, serde_json::Value)>;

/// A finite, lazily-pulled sequence of generated documents. Implementations
/// must produce each document as the stream is polled rather than building
/// the whole sequence up front — a job indexing every row in a table should
/// cost one document's worth of memory at a time, not the whole table's.
pub type DocumentStream = BoxStream<'static, GeneratedDoc>;

/// Knows how to assemble documents for one (index name, document type) pair.
/// Implementations own one database session for the lifetime of the
/// returned stream and release it on every exit path, including the stream
/// being dropped early.
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// `keys` empty means "all keys".
    async fn generate(&self, keys: Vec<String>) -> anyhow::Result<DocumentStream>;
}

type GeneratorFactory = Arc<dyn Fn() -> Arc<dyn DocumentGenerator> + Send + Sync>;

/// Lookup from (index name, document type) to a generator constructor.
/// Doubles as the indexer-selection registry: since only one concrete
/// `Indexer` exists, selecting "an indexer for (name, type)" reduces to
/// resolving a generator for that pair.
#[derive(Default, Clone)]
pub struct GeneratorRegistry {
    entries: HashMap<(String, String), GeneratorFactory>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        doc_type: impl Into<String>,
        factory: impl Fn() -> Arc<dyn DocumentGenerator> + Send + Sync + 'static,
    ) {
        self.entries.insert((name.into(), doc_type.into()), Arc::new(factory));
    }

    /// Returns `None` for unrecognized (name, type) pairs — the caller maps
    /// this to `IndexSvcError::UnsupportedTarget`.
    pub fn resolve(&self, name: &str, doc_type: &str) -> Option<Arc<dyn DocumentGenerator>> {
        self.entries
            .get(&(name.to_string(), doc_type.to_string()))
            .map(|factory| factory())
    }

    pub fn is_registered(&self, name: &str, doc_type: &str) -> bool {
        self.entries.contains_key(&(name.to_string(), doc_type.to_string()))
    }
}
