use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use futures::stream;
use indexsvc_core::{DocumentGenerator, DocumentStream};
use sqlx::{PgPool, Row};

/// Only developer-tenant users are indexed; other tenants don't participate
/// in this search index.
const DEVELOPER_TENANT_ID: i64 = 1;

/// Generates `users` documents: skills, and job location/technology/position
/// preferences, flattened onto one searchable record per user.
pub struct UserDocumentGenerator {
    pool: PgPool,
}

impl UserDocumentGenerator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn skills(&self, user_id: i64) -> anyhow::Result<Vec<serde_json::Value>> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, tech.name AS technology_name, s.yrs_experience, tech.id AS technology_id,
                   et.id AS expertise_type_id, et.name AS expertise_type_name
            FROM skills s
            JOIN technologies tech ON tech.id = s.technology_id
            JOIN expertise_types et ON et.id = s.expertise_type_id
            WHERE s.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                serde_json::json!({
                    "id": row.get::<i64, _>("id"),
                    "name": row.get::<String, _>("technology_name"),
                    "yrs_experience": row.get::<Option<i32>, _>("yrs_experience"),
                    "technology_id": row.get::<i64, _>("technology_id"),
                    "expertise_type_id": row.get::<i64, _>("expertise_type_id"),
                    "expertise_type": row.get::<String, _>("expertise_type_name"),
                })
            })
            .collect())
    }

    async fn location_prefs(&self, user_id: i64) -> anyhow::Result<Vec<serde_json::Value>> {
        let rows = sqlx::query(
            r#"
            SELECT jlp.id, loc.id AS location_id, loc.city, loc.state
            FROM job_location_prefs jlp
            JOIN locations loc ON loc.id = jlp.location_id
            WHERE jlp.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let city: Option<String> = row.get("city");
                let state: String = row.get("state");
                let name = match &city {
                    Some(city) => format!("{city}, {state}"),
                    None => state.clone(),
                };
                serde_json::json!({
                    "id": row.get::<i64, _>("id"),
                    "location_id": row.get::<i64, _>("location_id"),
                    "city": city,
                    "state": state,
                    "name": name,
                })
            })
            .collect())
    }

    async fn technology_prefs(&self, user_id: i64) -> anyhow::Result<Vec<serde_json::Value>> {
        let rows = sqlx::query(
            r#"
            SELECT jtp.id, tech.id AS technology_id, tech.name
            FROM job_technology_prefs jtp
            JOIN technologies tech ON tech.id = jtp.technology_id
            WHERE jtp.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                serde_json::json!({
                    "id": row.get::<i64, _>("id"),
                    "name": row.get::<String, _>("name"),
                    "technology_id": row.get::<i64, _>("technology_id"),
                })
            })
            .collect())
    }

    async fn position_prefs(&self, user_id: i64) -> anyhow::Result<Vec<serde_json::Value>> {
        let rows = sqlx::query(
            r#"
            SELECT jpp.id, pt.id AS position_type_id, pt.name, jpp.salary_start, jpp.salary_end
            FROM job_position_prefs jpp
            JOIN position_types pt ON pt.id = jpp.position_type_id
            WHERE jpp.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                serde_json::json!({
                    "id": row.get::<i64, _>("id"),
                    "type": row.get::<String, _>("name"),
                    "type_id": row.get::<i64, _>("position_type_id"),
                    "salary_start": row.get::<Option<i32>, _>("salary_start"),
                    "salary_end": row.get::<Option<i32>, _>("salary_end"),
                })
            })
            .collect())
    }
}

/// `current_year - developer_since.year` when known, else the highest
/// `yrs_experience` across the user's skills, else `null`.
fn derive_yrs_experience(developer_since: Option<NaiveDate>, skills: &[serde_json::Value]) -> Option<i64> {
    if let Some(since) = developer_since {
        return Some((Utc::now().year() - since.year()) as i64);
    }

    skills
        .iter()
        .filter_map(|skill| skill.get("yrs_experience").and_then(|v| v.as_i64()))
        .max()
}

#[async_trait]
impl DocumentGenerator for UserDocumentGenerator {
    async fn generate(&self, keys: Vec<String>) -> anyhow::Result<DocumentStream> {
        let ids: Vec<i64> = keys.iter().map(|k| k.parse()).collect::<Result<_, _>>()?;

        const BASE: &str = r#"
            SELECT u.id, u.date_joined, dp.developer_since
            FROM users u
            LEFT JOIN developer_profiles dp ON dp.user_id = u.id
            WHERE u.tenant_id = $1
        "#;

        let users = if ids.is_empty() {
            sqlx::query(&format!("{BASE} ORDER BY u.id"))
                .bind(DEVELOPER_TENANT_ID)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query(&format!("{BASE} AND u.id = ANY($2) ORDER BY u.id"))
                .bind(DEVELOPER_TENANT_ID)
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?
        };

        let remaining: std::collections::VecDeque<_> = users.into_iter().collect();

        Ok(Box::pin(stream::unfold(
            (self.pool.clone(), remaining),
            |(pool, mut remaining)| async move {
                let user = remaining.pop_front()?;
                let generator = UserDocumentGenerator { pool: pool.clone() };

                let doc = async {
                    let id: i64 = user.get("id");
                    let date_joined: Option<NaiveDate> = user.get("date_joined");
                    let developer_since: Option<NaiveDate> = user.get("developer_since");

                    let skills = generator.skills(id).await?;
                    let location_prefs = generator.location_prefs(id).await?;
                    let technology_prefs = generator.technology_prefs(id).await?;
                    let position_prefs = generator.position_prefs(id).await?;
                    let yrs_experience = derive_yrs_experience(developer_since, &skills);

                    let doc = serde_json::json!({
                        "id": id,
                        "skills": skills,
                        "technology_prefs": technology_prefs,
                        "location_prefs": location_prefs,
                        "position_prefs": position_prefs,
                        "yrs_experience": yrs_experience,
                        "joined": date_joined,
                        "score": 0,
                    });

                    anyhow::Ok((id.to_string(), doc))
                }
                .await;

                Some((doc, (pool, remaining)))
            },
        )))
    }
}
