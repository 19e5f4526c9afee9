//! Response mapping and validation.
//!
//! Converts raw JSON bodies into typed `Record`s at the boundary, so a
//! malformed response fails fast with a typed error instead of surfacing as
//! a missing-key panic deep in caller logic. Required fields are declared up
//! front; unknown extra fields are preserved in the record but unused.

use serde_json::{Map, Value};

use crate::errors::{FetchError, FetchResult};

/// A validated record mapped from a remote response.
///
/// Holds every field the service returned, including extras that were not
/// declared as required.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Map<String, Value>,
}

impl Record {
    /// Wraps an already-validated JSON object.
    pub(crate) fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Returns a field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Returns a field as a string slice.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(Value::as_str)
    }

    /// Returns a field as an integer.
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.values.get(field).and_then(Value::as_i64)
    }

    /// Returns a field as a boolean.
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.values.get(field).and_then(Value::as_bool)
    }

    /// Returns true if the record carries the field.
    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Returns the field names in the record.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the record and returns the underlying JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }

    /// Deserializes the record into a concrete type.
    pub fn deserialize<T: serde::de::DeserializeOwned>(self) -> FetchResult<T> {
        Ok(serde_json::from_value(Value::Object(self.values))?)
    }
}

/// Maps raw response bodies into `Record`s, validating required fields.
#[derive(Debug, Clone, Default)]
pub struct RecordMapper {
    required: Vec<String>,
}

impl RecordMapper {
    /// Creates a mapper with no required fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mapper that requires the given fields to be present.
    pub fn with_required<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Declares an additional required field.
    pub fn require(mut self, field: impl Into<String>) -> Self {
        self.required.push(field.into());
        self
    }

    /// Returns the declared required fields.
    pub fn required_fields(&self) -> &[String] {
        &self.required
    }

    /// Maps a raw JSON body into a single record.
    pub fn map(&self, raw: &[u8]) -> FetchResult<Record> {
        let value: Value = serde_json::from_slice(raw).map_err(|e| {
            FetchError::MalformedResponse {
                message: format!("body is not valid JSON: {}", e),
                field: None,
            }
        })?;
        self.map_value(value)
    }

    /// Maps an already-parsed JSON value into a record.
    pub fn map_value(&self, value: Value) -> FetchResult<Record> {
        let object = match value {
            Value::Object(map) => map,
            other => {
                return Err(FetchError::MalformedResponse {
                    message: format!("expected a JSON object, got {}", json_kind(&other)),
                    field: None,
                })
            }
        };

        for field in &self.required {
            if !object.contains_key(field) {
                return Err(FetchError::missing_field(field.clone()));
            }
        }

        Ok(Record::new(object))
    }

    /// Maps a raw JSON array body, validating every element.
    pub fn map_rows(&self, raw: &[u8]) -> FetchResult<Vec<Record>> {
        let value: Value = serde_json::from_slice(raw).map_err(|e| {
            FetchError::MalformedResponse {
                message: format!("body is not valid JSON: {}", e),
                field: None,
            }
        })?;

        let rows = match value {
            Value::Array(rows) => rows,
            other => {
                return Err(FetchError::MalformedResponse {
                    message: format!("expected a JSON array, got {}", json_kind(&other)),
                    field: None,
                })
            }
        };

        rows.into_iter().map(|row| self.map_value(row)).collect()
    }
}

/// Maps a raw JSON body directly into a concrete serde type.
///
/// For callers with a fixed schema; field presence is enforced by the type's
/// own non-optional fields.
pub fn map_as<T: serde::de::DeserializeOwned>(raw: &[u8]) -> FetchResult<T> {
    serde_json::from_slice(raw).map_err(|e| FetchError::MalformedResponse {
        message: e.to_string(),
        field: None,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_map_success() {
        let mapper = RecordMapper::with_required(["id", "name"]);
        let raw = br#"{"id": 42, "name": "alpha", "region": "eu-west-1"}"#;

        let record = mapper.map(raw).unwrap();
        assert_eq!(record.get_i64("id"), Some(42));
        assert_eq!(record.get_str("name"), Some("alpha"));
    }

    #[test]
    fn test_map_missing_required_field() {
        let mapper = RecordMapper::with_required(["id", "name"]);
        let raw = br#"{"id": 42}"#;

        let err = mapper.map(raw).unwrap_err();
        match err {
            FetchError::MalformedResponse { field, .. } => {
                assert_eq!(field.as_deref(), Some("name"));
            }
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_map_preserves_unknown_fields() {
        let mapper = RecordMapper::with_required(["id"]);
        let raw = br#"{"id": 1, "undeclared": {"nested": true}, "extra": [1, 2]}"#;

        let record = mapper.map(raw).unwrap();
        assert!(record.contains("undeclared"));
        assert!(record.contains("extra"));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_map_rejects_non_object() {
        let mapper = RecordMapper::new();

        let err = mapper.map(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse { .. }));

        let err = mapper.map(b"not json at all").unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse { .. }));
    }

    #[test]
    fn test_map_rows() {
        let mapper = RecordMapper::with_required(["id"]);
        let raw = br#"[{"id": 1}, {"id": 2, "name": "beta"}]"#;

        let rows = mapper.map_rows(raw).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get_str("name"), Some("beta"));
    }

    #[test]
    fn test_map_rows_fails_on_invalid_element() {
        let mapper = RecordMapper::with_required(["id"]);
        let raw = br#"[{"id": 1}, {"name": "missing id"}]"#;

        let err = mapper.map_rows(raw).unwrap_err();
        match err {
            FetchError::MalformedResponse { field, .. } => {
                assert_eq!(field.as_deref(), Some("id"));
            }
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_record_deserialize() {
        #[derive(serde::Deserialize)]
        struct Item {
            id: i64,
            name: String,
        }

        let mapper = RecordMapper::with_required(["id", "name"]);
        let record = mapper.map(br#"{"id": 7, "name": "gamma"}"#).unwrap();

        let item: Item = record.deserialize().unwrap();
        assert_eq!(item.id, 7);
        assert_eq!(item.name, "gamma");
    }

    #[test]
    fn test_map_as_typed() {
        #[derive(Debug, serde::Deserialize)]
        struct Item {
            id: i64,
        }

        let item: Item = map_as(br#"{"id": 9}"#).unwrap();
        assert_eq!(item.id, 9);

        let err = map_as::<Item>(br#"{"name": "no id"}"#).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse { .. }));
    }
}
