use async_trait::async_trait;
use futures::stream;
use indexsvc_core::{DocumentGenerator, DocumentStream};
use sqlx::{PgPool, Row};

/// Generates `technologies` documents, joining in the technology's type name.
pub struct TechnologyDocumentGenerator {
    pool: PgPool,
}

impl TechnologyDocumentGenerator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentGenerator for TechnologyDocumentGenerator {
    async fn generate(&self, keys: Vec<String>) -> anyhow::Result<DocumentStream> {
        let ids: Vec<i64> = keys.iter().map(|k| k.parse()).collect::<Result<_, _>>()?;

        const BASE: &str = r#"
            SELECT t.id, t.name, t.description, t.type_id, tt.name AS type_name
            FROM technologies t
            JOIN technology_types tt ON tt.id = t.type_id
        "#;

        let rows = if ids.is_empty() {
            sqlx::query(&format!("{BASE} ORDER BY t.id")).fetch_all(&self.pool).await?
        } else {
            sqlx::query(&format!("{BASE} WHERE t.id = ANY($1) ORDER BY t.id"))
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?
        };

        let docs = rows.into_iter().map(|row| {
            let id: i64 = row.get("id");
            let doc = serde_json::json!({
                "id": id,
                "name": row.get::<String, _>("name"),
                "description": row.get::<Option<String>, _>("description"),
                "type_id": row.get::<i64, _>("type_id"),
                "type": row.get::<String, _>("type_name"),
            });
            Ok((id.to_string(), doc))
        });

        Ok(Box::pin(stream::iter(docs)))
    }
}
