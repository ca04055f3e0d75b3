use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use super::{StoreError, StoreResult};

/// A JSON object stored at a [super::DocumentPath].
///
/// Fields can be marked as server timestamps, which the store fills in
/// with the commit time when the document is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Map<String, Value>,
    server_timestamps: BTreeSet<String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            server_timestamps: BTreeSet::new(),
        }
    }

    /// Creates a document from a stored JSON value, which must be an object
    pub fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self::from_fields(fields)),
            other => Err(StoreError::Internal(
                format!("documents must be JSON objects, got {other}").into(),
            )),
        }
    }

    /// Serializes a record into a document
    pub fn from_record<T>(record: &T) -> StoreResult<Self>
    where
        T: Serialize,
    {
        Self::from_value(serde_json::to_value(record)?)
    }

    /// Deserializes the document into a record
    pub fn to_record<T>(&self) -> StoreResult<T>
    where
        T: DeserializeOwned,
    {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }

    /// Marks a field to be set to the commit time by the store
    pub fn with_server_timestamp(mut self, field: &str) -> Self {
        self.fields.remove(field);
        self.server_timestamps.insert(field.to_string());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn server_timestamps(&self) -> impl Iterator<Item = &str> {
        self.server_timestamps.iter().map(String::as_str)
    }

    /// Fills in every pending server timestamp. Called by stores on commit.
    pub fn resolve_server_timestamps(mut self, at: DateTime<Utc>) -> Self {
        let stamp = Value::String(at.to_rfc3339_opts(SecondsFormat::Micros, true));

        for field in std::mem::take(&mut self.server_timestamps) {
            self.fields.insert(field, stamp.clone());
        }

        self
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

#[cfg(test)]
mod test {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::Document;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Stamped {
        owner_id: String,
        created_at: DateTime<Utc>,
    }

    #[test]
    fn server_timestamps_resolve_on_commit() {
        let document = Document::from_value(json!({ "ownerId": "abc" }))
            .unwrap()
            .with_server_timestamp("createdAt");

        assert_eq!(document.get("createdAt"), None);
        assert_eq!(document.server_timestamps().collect::<Vec<_>>(), vec!["createdAt"]);

        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let resolved = document.resolve_server_timestamps(at);

        assert_eq!(resolved.server_timestamps().count(), 0);
        assert_eq!(
            resolved.to_record::<Stamped>().unwrap(),
            Stamped {
                owner_id: "abc".to_string(),
                created_at: at,
            }
        );
    }

    #[test]
    fn rejects_non_objects() {
        assert!(Document::from_value(json!([1, 2, 3])).is_err());
        assert!(Document::from_record(&"just a string").is_err());
    }

    #[test]
    fn mismatched_record_is_a_serialization_error() {
        let document = Document::from_value(json!({ "ownerId": 5 })).unwrap();
        let result = document.to_record::<Stamped>();

        assert!(matches!(result, Err(super::StoreError::Serialization(_))));
    }
}
