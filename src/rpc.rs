//! Thin HTTP producer surface: `POST /index` and `POST /index-all`. Each
//! handler validates its input and inserts exactly one `IndexJob` row — no
//! claiming, no indexing happens here. Kept deliberately thin: this is the
//! producer side of the pipeline, not part of the indexing core.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use indexsvc_core::{IndexAction, IndexOp, JobStore, ValidationError};
use serde::Deserialize;

#[derive(Clone)]
pub struct RpcState {
    pub store: Arc<dyn JobStore>,
    pub max_retry_attempts: i32,
}

pub fn router(state: RpcState) -> Router {
    Router::new()
        .route("/index", post(index))
        .route("/index-all", post(index_all))
        .with_state(state)
}

/// Request body shared by both endpoints.
#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    pub context: String,
    pub action: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub keys: Vec<String>,
    /// Unix timestamp; if present, used as the job's `not_before` instead of
    /// the server's current time.
    #[serde(default)]
    pub not_before: Option<i64>,
}

async fn index(State(state): State<RpcState>, Json(req): Json<IndexRequest>) -> Response {
    submit(state, req, false).await
}

async fn index_all(State(state): State<RpcState>, Json(req): Json<IndexRequest>) -> Response {
    submit(state, req, true).await
}

async fn submit(state: RpcState, req: IndexRequest, index_all: bool) -> Response {
    match validate_and_build(req, index_all) {
        Ok(op) => {
            let not_before = op.not_before.unwrap_or_else(Utc::now);
            match state
                .store
                .insert(&op.context, op.payload, not_before, state.max_retry_attempts)
                .await
            {
                Ok(id) => (StatusCode::ACCEPTED, Json(serde_json::json!({ "job_id": id }))).into_response(),
                Err(err) => {
                    tracing::error!(error = %err, "failed to insert index job");
                    (StatusCode::SERVICE_UNAVAILABLE, "Unavailable").into_response()
                }
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "rejected index request");
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
    }
}

struct ValidatedOp {
    context: String,
    payload: serde_json::Value,
    not_before: Option<DateTime<Utc>>,
}

/// Rejects without inserting a row on: empty context, an action outside
/// `CREATE`/`UPDATE`/`DELETE`, empty name, empty type, or empty keys when
/// not `index_all`. Both endpoints always enqueue an Update job regardless
/// of the requested action — indexing from this surface is always an
/// upsert; `action` is accepted for compatibility with callers that send it
/// and rejected only when it names something we don't recognize at all.
fn validate_and_build(req: IndexRequest, index_all: bool) -> Result<ValidatedOp, ValidationError> {
    if req.context.trim().is_empty() {
        return Err(ValidationError::EmptyContext);
    }
    if !matches!(req.action.as_str(), "CREATE" | "UPDATE" | "DELETE") {
        return Err(ValidationError::UnsupportedAction);
    }
    if req.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if req.doc_type.trim().is_empty() {
        return Err(ValidationError::EmptyType);
    }
    if !index_all && req.keys.is_empty() {
        return Err(ValidationError::EmptyKeys);
    }

    let op = IndexOp {
        action: IndexAction::Update,
        name: req.name,
        doc_type: req.doc_type,
        keys: if index_all { Vec::new() } else { req.keys },
    };

    let not_before = req.not_before.and_then(|ts| DateTime::from_timestamp(ts, 0));

    Ok(ValidatedOp {
        context: req.context,
        payload: op.encode(),
        not_before,
    })
}
