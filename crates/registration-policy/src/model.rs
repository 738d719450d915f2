use crate::key::ParameterKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted policy parameter.
///
/// At most one active record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub id: i64,
    pub type_id: i64,
    pub key: String,
    pub description: Option<String>,
    pub value: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ParameterRecord {
    /// The recognized key this record is stored under, if any.
    pub fn recognized_key(&self) -> Option<ParameterKey> {
        ParameterKey::parse(&self.key)
    }

    pub fn is_recognized(&self) -> bool {
        self.recognized_key().is_some()
    }
}

/// Catalog entry describing a parameter key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterTypeRecord {
    pub id: i64,
    pub key: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ParameterTypeRecord {
    /// Description given to catalog entries created implicitly by an upsert.
    pub fn auto_description(key: &str) -> String {
        format!("auto-generated for {}", key)
    }
}

/// Read-only projection of a [`ParameterRecord`] returned to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterView {
    pub id: i64,
    pub type_id: i64,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ParameterRecord> for ParameterView {
    fn from(record: ParameterRecord) -> Self {
        Self {
            id: record.id,
            type_id: record.type_id,
            key: record.key,
            description: record.description,
            value: record.value,
            active: record.active,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str) -> ParameterRecord {
        let now = Utc::now();
        ParameterRecord {
            id: 1,
            type_id: 1,
            key: key.to_string(),
            description: None,
            value: "8".to_string(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn recognizes_only_policy_keys() {
        assert_eq!(
            record("password.min.length").recognized_key(),
            Some(ParameterKey::MinLength)
        );
        assert!(!record("some.other.key").is_recognized());
    }

    #[test]
    fn view_serializes_camel_case() {
        let view = ParameterView::from(record("password.min.length"));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["key"], "password.min.length");
        assert_eq!(json["typeId"], 1);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("description").is_none());
    }
}
