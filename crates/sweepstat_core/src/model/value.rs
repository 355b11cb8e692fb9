//! Scalar field values and grouping keys
//!
//! A flattened record maps field names to [`FieldValue`]s. Values carry a
//! total order (`Null < Number < Text`, numbers by IEEE total order with
//! `-0.0` folded into `0.0`) so they can key sorted maps and make every
//! grouped output deterministic.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Shared missing value for lookups that resolve to nothing
pub(crate) static NULL: FieldValue = FieldValue::Null;

/// Fold negative zero into positive zero
fn unsigned_zero(n: f64) -> f64 {
    if n == 0.0 { 0.0 } else { n }
}

/// A single scalar cell of a flattened record
#[derive(Debug, Clone, Default)]
pub enum FieldValue {
    /// Missing value (absent field, JSON `null`, or an unresolvable lookup)
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Convert a JSON value into a scalar.
    ///
    /// Booleans become `1.0`/`0.0`; arrays and objects are not scalars and
    /// degrade to `Null`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => FieldValue::Number(if *b { 1.0 } else { 0.0 }),
            serde_json::Value::Number(n) => n.as_f64().map_or(FieldValue::Null, FieldValue::from),
            serde_json::Value::String(s) => FieldValue::Text(s.clone()),
            serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                FieldValue::Null
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric view of the value; text and null have none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce to a number: numeric text is parsed, anything unparsable is `Null`.
    #[must_use]
    pub fn to_numeric(&self) -> Self {
        match self {
            FieldValue::Number(n) => FieldValue::from(*n),
            FieldValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_or(FieldValue::Null, FieldValue::from),
            FieldValue::Null => FieldValue::Null,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Number(_) => 1,
            FieldValue::Text(_) => 2,
        }
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::Number(a), FieldValue::Number(b)) => unsigned_zero(*a).total_cmp(&unsigned_zero(*b)),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            // total_cmp equality is bit equality once zeros are folded
            FieldValue::Number(n) => unsigned_zero(*n).to_bits().hash(state),
            FieldValue::Text(s) => s.hash(state),
            FieldValue::Null => {}
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(FieldValue::from_json(&value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(unsigned_zero(value))
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::from)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Ordered tuple of grouping-field values identifying one group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<FieldValue>);

impl GroupKey {
    pub fn values(&self) -> &[FieldValue] {
        &self.0
    }

    /// First component; the level for single-field groupings
    pub fn first(&self) -> &FieldValue {
        self.0.first().unwrap_or(&NULL)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_across_kinds() {
        let mut values = vec![
            FieldValue::from("b"),
            FieldValue::from(2.0),
            FieldValue::Null,
            FieldValue::from(-1.0),
            FieldValue::from("a"),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                FieldValue::Null,
                FieldValue::from(-1.0),
                FieldValue::from(2.0),
                FieldValue::from("a"),
                FieldValue::from("b"),
            ]
        );
    }

    #[test]
    fn test_signed_zeros_are_one_level() {
        use std::collections::BTreeMap;
        use rustc_hash::FxHashMap;

        assert_eq!(FieldValue::Number(-0.0), FieldValue::Number(0.0));
        assert_eq!(FieldValue::from(-0.0).as_f64().map(f64::is_sign_positive), Some(true));
        assert_eq!(
            FieldValue::from_json(&serde_json::json!(-0.0)).to_string(),
            FieldValue::from(0.0).to_string()
        );

        let mut sorted = BTreeMap::new();
        let mut hashed = FxHashMap::default();
        for value in [FieldValue::Number(-0.0), FieldValue::Number(0.0), FieldValue::from(-0.0)] {
            *sorted.entry(value.clone()).or_insert(0) += 1;
            *hashed.entry(value).or_insert(0) += 1;
        }
        assert_eq!(sorted.len(), 1);
        assert_eq!(hashed.len(), 1);
        assert_eq!(hashed[&FieldValue::from(0.0)], 3);
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(FieldValue::from_json(&serde_json::json!(true)), FieldValue::from(1.0));
        assert_eq!(FieldValue::from_json(&serde_json::json!(3)), FieldValue::from(3.0));
        assert_eq!(FieldValue::from_json(&serde_json::json!("x")), FieldValue::from("x"));
        assert!(FieldValue::from_json(&serde_json::json!([1, 2])).is_null());
        assert!(FieldValue::from_json(&serde_json::json!({"a": 1})).is_null());
    }

    #[test]
    fn test_to_numeric() {
        assert_eq!(FieldValue::from(" 0.5 ").to_numeric(), FieldValue::from(0.5));
        assert!(FieldValue::from("fast").to_numeric().is_null());
        assert!(FieldValue::Null.to_numeric().is_null());
    }

    #[test]
    fn test_serializes_as_bare_scalar() {
        let key = GroupKey(vec![FieldValue::from(0.2), FieldValue::from("x"), FieldValue::Null]);
        assert_eq!(serde_json::to_string(&key).unwrap(), r#"[0.2,"x",null]"#);
    }
}
