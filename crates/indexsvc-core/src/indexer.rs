//! The indexer: given a decoded [`IndexOp`], drives one bulk session against
//! a pooled [`IndexClient`]. One generic indexer covers every index, generic
//! over whichever [`DocumentGenerator`] the registry resolved for the op's
//! (name, type).

use std::sync::Arc;

use futures::StreamExt;

use crate::error::IndexSvcError;
use crate::generator::DocumentGenerator;
use crate::index_op::{IndexAction, IndexOp};
use crate::pool::Pool;
use crate::search::IndexClient;

/// Number of buffered operations before a bulk session auto-flushes.
pub const DEFAULT_AUTOFLUSH: usize = 20;

pub struct Indexer {
    client_pool: Arc<Pool<Arc<dyn IndexClient>>>,
    autoflush: usize,
}

impl Indexer {
    pub fn new(client_pool: Arc<Pool<Arc<dyn IndexClient>>>, autoflush: usize) -> Self {
        Self { client_pool, autoflush }
    }

    /// Execute `op`, returning the count of successfully issued operations.
    pub async fn index(
        &self,
        op: &IndexOp,
        generator: Arc<dyn DocumentGenerator>,
    ) -> Result<usize, IndexSvcError> {
        let client = self.client_pool.checkout().await?;

        let mut session = client
            .open_bulk_session(&op.name, &op.doc_type, self.autoflush)
            .await
            .map_err(|e| IndexSvcError::Backend(e.to_string()))?;

        let count = match op.action {
            IndexAction::Create => self.put_all(session.as_mut(), &op.keys, generator, true).await?,
            IndexAction::Update => self.put_all(session.as_mut(), &op.keys, generator, false).await?,
            IndexAction::Delete => self.delete_all(session.as_mut(), &op.keys).await?,
        };

        session
            .flush()
            .await
            .map_err(|e| IndexSvcError::Backend(e.to_string()))?;

        Ok(count)
    }

    /// Shared Create/Update loop: generator output drives `put(key, doc, create)`.
    async fn put_all(
        &self,
        session: &mut dyn crate::search::BulkSession,
        keys: &[String],
        generator: Arc<dyn DocumentGenerator>,
        create: bool,
    ) -> Result<usize, IndexSvcError> {
        let mut stream = generator
            .generate(keys.to_vec())
            .await
            .map_err(IndexSvcError::Generator)?;

        let mut count = 0usize;
        while let Some(item) = stream.next().await {
            let (key, doc) = item.map_err(IndexSvcError::Generator)?;
            session
                .put(&key, doc, create)
                .await
                .map_err(|e| IndexSvcError::Backend(e.to_string()))?;

            if let Some(err) = session.errors().last() {
                return Err(IndexSvcError::Backend(err.clone()));
            }
            count += 1;
        }

        Ok(count)
    }

    /// Delete loop: no generator call, iterates `op.keys` directly. There is
    /// no delete-all: a `Delete` op with an empty key list deletes nothing.
    async fn delete_all(
        &self,
        session: &mut dyn crate::search::BulkSession,
        keys: &[String],
    ) -> Result<usize, IndexSvcError> {
        let mut count = 0usize;
        for key in keys {
            session
                .delete(key)
                .await
                .map_err(|e| IndexSvcError::Backend(e.to_string()))?;

            if let Some(err) = session.errors().last() {
                return Err(IndexSvcError::Backend(err.clone()));
            }
            count += 1;
        }
        Ok(count)
    }
}
