use async_trait::async_trait;
use futures::stream;
use indexsvc_core::{DocumentGenerator, DocumentStream};
use sqlx::{PgPool, Row};

/// Generates `locations` documents: city/state pairs grouped under a region.
pub struct LocationDocumentGenerator {
    pool: PgPool,
}

impl LocationDocumentGenerator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentGenerator for LocationDocumentGenerator {
    async fn generate(&self, keys: Vec<String>) -> anyhow::Result<DocumentStream> {
        let ids: Vec<i64> = keys.iter().map(|k| k.parse()).collect::<Result<_, _>>()?;

        let rows = if ids.is_empty() {
            sqlx::query("SELECT id, region FROM locations ORDER BY id")
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query("SELECT id, region FROM locations WHERE id = ANY($1) ORDER BY id")
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?
        };

        let docs = rows.into_iter().map(|row| {
            let id: i64 = row.get("id");
            let region: String = row.get("region");
            Ok((id.to_string(), serde_json::json!({ "id": id, "region": region })))
        });

        Ok(Box::pin(stream::iter(docs)))
    }
}
