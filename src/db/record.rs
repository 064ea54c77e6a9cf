//! Record Types
//!
//! A row as the helper hands it out: identity columns plus the table's own fields.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// == Record Id ==
/// Primary key of a row. Tables use either integer or text (uuid) keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Parses a path segment: integers become `Int`, anything else `Text`.
    pub fn parse(raw: &str) -> Self {
        raw.parse()
            .map(RecordId::Int)
            .unwrap_or_else(|_| RecordId::Text(raw.to_string()))
    }

    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(n) => Value::from(*n),
            RecordId::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<i32> for RecordId {
    fn from(id: i32) -> Self {
        RecordId::Int(i64::from(id))
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::Text(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

impl From<&RecordId> for RecordId {
    fn from(id: &RecordId) -> Self {
        id.clone()
    }
}

// == Record ==
/// A stored row: `id`, `created_at`, optional `updated_at`, and the table's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T = Map<String, Value>> {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: T,
}

/// Untyped row, as served by the generic HTTP endpoints.
pub type Row = Record<Map<String, Value>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize, Serialize)]
    struct Group {
        name: String,
    }

    #[test]
    fn test_record_id_parse() {
        assert_eq!(RecordId::parse("42"), RecordId::Int(42));
        assert_eq!(
            RecordId::parse("0b7c7f5e-4f1e-4a38-9a55-3c3a0c1f2d11"),
            RecordId::Text("0b7c7f5e-4f1e-4a38-9a55-3c3a0c1f2d11".to_string())
        );
        assert_eq!(RecordId::Int(7).to_string(), "7");
    }

    #[test]
    fn test_record_flattens_fields() {
        let row = json!({
            "id": 3,
            "created_at": "2024-05-01T10:00:00.123456+00:00",
            "updated_at": null,
            "name": "U12 Keepers"
        });

        let record: Record<Group> = serde_json::from_value(row).unwrap();

        assert_eq!(record.id, RecordId::Int(3));
        assert!(record.updated_at.is_none());
        assert_eq!(record.fields.name, "U12 Keepers");
    }

    #[test]
    fn test_untyped_row_keeps_extra_columns() {
        let row = json!({
            "id": "abc",
            "created_at": "2024-05-01T10:00:00Z",
            "patient_id": 9,
            "notes": "follow-up"
        });

        let record: Row = serde_json::from_value(row).unwrap();

        assert_eq!(record.id, RecordId::from("abc"));
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields["patient_id"], json!(9));
    }
}
