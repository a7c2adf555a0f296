use async_trait::async_trait;
use futures::stream;
use indexsvc_core::{DocumentGenerator, DocumentStream};
use sqlx::{PgPool, Row};

const ROOT_TOPIC_RANK: i32 = 0;

/// Generates `topics` documents for root topics (rank 0) only — sub-topics
/// are folded into the root's `tree` and `subtopic_summary` fields rather
/// than indexed on their own, since nothing searches for them directly.
pub struct TopicDocumentGenerator {
    pool: PgPool,
}

impl TopicDocumentGenerator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn topic_tree(&self, root_id: i64) -> anyhow::Result<Vec<(serde_json::Value, i32, String, String)>> {
        let rows = sqlx::query(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT t.id, t.parent_id, t.type_id, t.duration, t.title, t.description,
                       t.recommended_participants, t.rank, t.public, t.active, 0 AS level
                FROM topics t
                WHERE t.id = $1
                UNION ALL
                SELECT t.id, t.parent_id, t.type_id, t.duration, t.title, t.description,
                       t.recommended_participants, t.rank, t.public, t.active, s.level + 1
                FROM topics t
                JOIN subtree s ON t.parent_id = s.id
            )
            SELECT subtree.*, tt.name AS type_name
            FROM subtree
            JOIN topic_types tt ON tt.id = subtree.type_id
            ORDER BY level, rank
            "#,
        )
        .bind(root_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let level: i32 = row.get("level");
                let title: String = row.get("title");
                let description: String = row.get("description");
                let json = serde_json::json!({
                    "id": row.get::<i64, _>("id"),
                    "type_id": row.get::<i64, _>("type_id"),
                    "type": row.get::<String, _>("type_name"),
                    "duration": row.get::<Option<i32>, _>("duration"),
                    "title": title,
                    "description": description,
                    "recommended_participants": row.get::<Option<i32>, _>("recommended_participants"),
                    "rank": row.get::<i32, _>("rank"),
                    "public": row.get::<bool, _>("public"),
                    "active": row.get::<bool, _>("active"),
                    "level": level,
                });
                (json, level, title, description)
            })
            .collect())
    }

    async fn tags(&self, root_id: i64) -> anyhow::Result<Vec<serde_json::Value>> {
        let rows = sqlx::query(
            r#"
            SELECT tag.id, tag.name
            FROM tags tag
            JOIN topic_tags tt ON tt.tag_id = tag.id
            WHERE tt.topic_id = $1
            "#,
        )
        .bind(root_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                serde_json::json!({
                    "id": row.get::<i64, _>("id"),
                    "name": row.get::<String, _>("name"),
                })
            })
            .collect())
    }
}

#[async_trait]
impl DocumentGenerator for TopicDocumentGenerator {
    async fn generate(&self, keys: Vec<String>) -> anyhow::Result<DocumentStream> {
        let ids: Vec<i64> = keys.iter().map(|k| k.parse()).collect::<Result<_, _>>()?;

        const BASE: &str = r#"
            SELECT t.id, t.type_id, tt.name AS type_name, t.duration, t.title, t.description,
                   t.recommended_participants, t.rank, t.public, t.active
            FROM topics t
            JOIN topic_types tt ON tt.id = t.type_id
            WHERE t.rank = $1
        "#;

        let roots = if ids.is_empty() {
            sqlx::query(&format!("{BASE} ORDER BY t.id"))
                .bind(ROOT_TOPIC_RANK)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query(&format!("{BASE} AND t.id = ANY($2) ORDER BY t.id"))
                .bind(ROOT_TOPIC_RANK)
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?
        };

        let remaining: std::collections::VecDeque<_> = roots.into_iter().collect();

        Ok(Box::pin(stream::unfold(
            (self.pool.clone(), remaining),
            |(pool, mut remaining)| async move {
                let root = remaining.pop_front()?;
                let generator = TopicDocumentGenerator { pool: pool.clone() };

                let doc = async {
                    let id: i64 = root.get("id");
                    let tree = generator.topic_tree(id).await?;
                    let tags = generator.tags(id).await?;

                    // Skip the root topic's own title/description when building the
                    // summary; only sub-topics contribute.
                    let subtopic_summary = tree
                        .iter()
                        .filter(|(_, level, _, _)| *level != 0)
                        .map(|(_, _, title, description)| format!("{title} {description}"))
                        .collect::<String>();

                    let doc = serde_json::json!({
                        "id": id,
                        "type": root.get::<String, _>("type_name"),
                        "duration": root.get::<Option<i32>, _>("duration"),
                        "title": root.get::<String, _>("title"),
                        "description": root.get::<String, _>("description"),
                        "subtopic_summary": subtopic_summary,
                        "public": root.get::<bool, _>("public"),
                        "active": root.get::<bool, _>("active"),
                        "tree": tree.into_iter().map(|(json, ..)| json).collect::<Vec<_>>(),
                        "tags": tags,
                    });

                    anyhow::Ok((id.to_string(), doc))
                }
                .await;

                Some((doc, (pool, remaining)))
            },
        )))
    }
}
