//! Uniform field access over heterogeneous result records
//!
//! Results reach the core either as typed records (fields are struct
//! attributes) or as raw JSON objects (fields are mapping entries). Both
//! implement [`FieldSource`], and every extraction goes through [`get`].

use super::value::FieldValue;

/// A record whose fields can be looked up by name.
pub trait FieldSource {
    /// Scalar stored under `field`.
    ///
    /// Returns `None` when the field is absent or holds a non-scalar;
    /// `Some(FieldValue::Null)` when it is present but null.
    fn scalar(&self, field: &str) -> Option<FieldValue>;

    /// Nested record stored under `field`
    fn nested(&self, field: &str) -> Option<&dyn FieldSource>;

    /// Names of the fields carried by this record, in a stable order
    fn field_names(&self) -> Vec<String>;
}

/// Look up `field` on `source`, falling back to `default` when the source is
/// missing or does not carry the field. Never fails.
pub fn get(source: Option<&dyn FieldSource>, field: &str, default: FieldValue) -> FieldValue {
    source
        .and_then(|s| s.scalar(field))
        .unwrap_or(default)
}

/// Every scalar entry of a nested record, keyed by name
pub fn scalar_entries(source: &dyn FieldSource) -> Vec<(String, FieldValue)> {
    source
        .field_names()
        .into_iter()
        .filter_map(|name| source.scalar(&name).map(|value| (name, value)))
        .collect()
}

impl FieldSource for serde_json::Value {
    fn scalar(&self, field: &str) -> Option<FieldValue> {
        match self.as_object()?.get(field)? {
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
            value => Some(FieldValue::from_json(value)),
        }
    }

    fn nested(&self, field: &str) -> Option<&dyn FieldSource> {
        self.as_object()?
            .get(field)
            .filter(|value| value.is_object())
            .map(|value| value as &dyn FieldSource)
    }

    fn field_names(&self) -> Vec<String> {
        self.as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }
}
