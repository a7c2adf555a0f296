//! Elasticsearch-family bulk indexing client.
//!
//! Implements [`indexsvc_core::IndexClient`]/[`indexsvc_core::BulkSession`]
//! against the `_bulk` NDJSON endpoint. One concrete realization of the
//! put/delete/errors/flushing contract, not a full client.

use std::fmt::Write as _;

use async_trait::async_trait;
use indexsvc_core::{BulkSession, IndexClient};
use serde::Deserialize;

/// A pooled client pointed at one Elasticsearch-family endpoint.
pub struct EsClient {
    http: reqwest::Client,
    endpoint: String,
}

impl EsClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl IndexClient for EsClient {
    async fn open_bulk_session(
        &self,
        name: &str,
        doc_type: &str,
        autoflush: usize,
    ) -> anyhow::Result<Box<dyn BulkSession>> {
        Ok(Box::new(EsBulkSession {
            http: self.http.clone(),
            endpoint: self.endpoint.clone(),
            index: name.to_string(),
            doc_type: doc_type.to_string(),
            autoflush,
            buffer: Vec::new(),
            errors: Vec::new(),
        }))
    }
}

enum BufferedOp {
    Put { key: String, doc: serde_json::Value, create: bool },
    Delete { key: String },
}

/// Auto-flushing batch of put/delete operations against one index.
pub struct EsBulkSession {
    http: reqwest::Client,
    endpoint: String,
    index: String,
    doc_type: String,
    autoflush: usize,
    buffer: Vec<BufferedOp>,
    errors: Vec<String>,
}

#[derive(Deserialize)]
struct BulkResponse {
    errors: bool,
    items: Vec<serde_json::Value>,
}

impl EsBulkSession {
    fn ndjson_body(&self) -> String {
        let mut body = String::new();
        for op in &self.buffer {
            match op {
                BufferedOp::Put { key, doc, create } => {
                    let action = if *create { "create" } else { "index" };
                    let _ = writeln!(
                        body,
                        "{}",
                        serde_json::json!({ action: { "_index": self.index, "_id": key } })
                    );
                    let _ = writeln!(body, "{}", doc);
                }
                BufferedOp::Delete { key } => {
                    let _ = writeln!(
                        body,
                        "{}",
                        serde_json::json!({ "delete": { "_index": self.index, "_id": key } })
                    );
                }
            }
        }
        body
    }

    async fn send_buffer(&mut self) -> anyhow::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        tracing::debug!(index = %self.index, doc_type = %self.doc_type, count = self.buffer.len(), "flushing bulk session");
        let body = self.ndjson_body();
        let response = self
            .http
            .post(format!("{}/_bulk", self.endpoint))
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: BulkResponse = response.json().await?;
        self.buffer.clear();

        if parsed.errors {
            for item in parsed.items {
                if let Some(reason) = first_item_error(&item) {
                    self.errors.push(reason);
                }
            }
        }

        Ok(())
    }
}

fn first_item_error(item: &serde_json::Value) -> Option<String> {
    item.as_object()?.values().find_map(|action_result| {
        action_result.get("error").map(|err| err.to_string())
    })
}

#[async_trait]
impl BulkSession for EsBulkSession {
    async fn put(&mut self, key: &str, doc: serde_json::Value, create: bool) -> anyhow::Result<()> {
        self.buffer.push(BufferedOp::Put {
            key: key.to_string(),
            doc,
            create,
        });
        if self.buffer.len() >= self.autoflush {
            self.send_buffer().await?;
        }
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        self.buffer.push(BufferedOp::Delete { key: key.to_string() });
        if self.buffer.len() >= self.autoflush {
            self.send_buffer().await?;
        }
        Ok(())
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }

    async fn flush(&mut self) -> anyhow::Result<()> {
        self.send_buffer().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndjson_body_pairs_action_line_with_source_line() {
        let session = EsBulkSession {
            http: reqwest::Client::new(),
            endpoint: "http://localhost:9200".into(),
            index: "users".into(),
            doc_type: "user".into(),
            autoflush: 20,
            buffer: vec![
                BufferedOp::Put {
                    key: "1".into(),
                    doc: serde_json::json!({"id": "1"}),
                    create: true,
                },
                BufferedOp::Delete { key: "2".into() },
            ],
            errors: vec![],
        };

        let body = session.ndjson_body();
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"create\""));
        assert!(lines[1].contains("\"id\":\"1\""));
        assert!(lines[2].contains("\"delete\""));
    }

    #[test]
    fn first_item_error_extracts_nested_error() {
        let item = serde_json::json!({
            "index": { "_id": "1", "status": 409, "error": {"type": "version_conflict"} }
        });
        assert!(first_item_error(&item).is_some());

        let ok_item = serde_json::json!({ "index": { "_id": "1", "status": 201 } });
        assert!(first_item_error(&ok_item).is_none());
    }
}
