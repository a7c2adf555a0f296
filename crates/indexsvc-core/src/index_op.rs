//! In-memory and wire representation of one indexing request.

use serde::{Deserialize, Serialize};

/// The operation an [`IndexOp`] asks the indexer to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexAction {
    Create,
    Update,
    Delete,
}

/// A decoded indexing request: an action against a (name, type) pair over a
/// possibly-empty set of keys. An empty `keys` list means "all keys".
///
/// Round-trips through JSON via [`IndexOp::encode`] / [`IndexOp::decode`];
/// this is the only payload shape the `data` column of an `IndexJob` row may
/// hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOp {
    pub action: IndexAction,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub keys: Vec<String>,
}

impl IndexOp {
    pub fn new(action: IndexAction, name: impl Into<String>, doc_type: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            action,
            name: name.into(),
            doc_type: doc_type.into(),
            keys,
        }
    }

    /// True when `keys` is empty, i.e. the op targets every entity.
    pub fn is_all_keys(&self) -> bool {
        self.keys.is_empty()
    }

    /// Serialize to the canonical JSON payload stored in `IndexJob.data`.
    pub fn encode(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("IndexOp fields are all JSON-representable")
    }

    /// Decode a job payload. Failure here is a [`crate::error::IndexSvcError::Decode`],
    /// handled by the coordinator, not here.
    pub fn decode(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ops() -> Vec<IndexOp> {
        vec![
            IndexOp::new(IndexAction::Create, "users", "user", vec!["1".into()]),
            IndexOp::new(IndexAction::Update, "technologies", "technology", vec![]),
            IndexOp::new(
                IndexAction::Delete,
                "topics",
                "topic",
                vec!["42".into(), "43".into()],
            ),
        ]
    }

    #[test]
    fn round_trip() {
        for op in sample_ops() {
            let encoded = op.encode();
            let decoded = IndexOp::decode(&encoded).expect("decode");
            assert_eq!(op, decoded);
        }
    }

    #[test]
    fn encodes_canonical_shape() {
        let op = IndexOp::new(IndexAction::Update, "users", "user", vec!["1".into()]);
        let encoded = op.encode();
        assert_eq!(encoded["action"], "UPDATE");
        assert_eq!(encoded["name"], "users");
        assert_eq!(encoded["type"], "user");
        assert_eq!(encoded["keys"], serde_json::json!(["1"]));
    }

    #[test]
    fn empty_keys_means_all() {
        let op = IndexOp::new(IndexAction::Update, "users", "user", vec![]);
        assert!(op.is_all_keys());
    }

    #[test]
    fn decode_rejects_malformed_payload() {
        let bad = serde_json::json!({"action": "CREATE", "name": "users"});
        assert!(IndexOp::decode(&bad).is_err());
    }
}
