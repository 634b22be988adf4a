use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::error::TableError;

/// A value that can be stored in a table cell.
///
/// The set is closed: everything a client supplies is funneled into one of
/// these variants by [`Value::from`] before it reaches a row. The untagged
/// serde representation means payloads read and write as plain JSON
/// (null/bool/number/string/array/object), with no variant tags.
///
/// # Example
///
/// ```
/// use rowbase::Value;
///
/// let age = Value::Int(30);
/// let name = Value::Str("Alice".to_string());
/// let tags = Value::List(vec![Value::Str("admin".to_string())]);
/// let missing = Value::Null;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absence of data.
    Null,

    /// A boolean value (true/false).
    Bool(bool),

    /// A 64-bit signed integer value.
    Int(i64),

    /// A 64-bit floating point number.
    Float(f64),

    /// A UTF-8 text string.
    Str(String),

    /// An ordered sequence of values.
    List(Vec<Value>),

    /// A string-keyed mapping of values.
    Map(BTreeMap<String, Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(fl) => write!(f, "{fl}"),
            Value::Str(s) => write!(f, "{s}"),
            composite => {
                let rendered = serde_json::to_string(composite).map_err(|_| fmt::Error)?;
                write!(f, "{rendered}")
            }
        }
    }
}

/// Coercion from an arbitrary client-supplied JSON value.
///
/// Structural kinds map directly. A number representable as neither `i64`
/// nor `f64` is kept as its textual rendering; the final fallback to null
/// only applies to number representations serde_json cannot expose at all.
/// Lossy on purpose, and never an error.
impl From<serde_json::Value> for Value {
    fn from(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if n.as_u64().is_some() {
                    // Above i64::MAX: keep the digits, lose the kind.
                    Value::Str(n.to_string())
                } else if let Some(fl) = n.as_f64() {
                    Value::Float(fl)
                } else {
                    Value::Null
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl Value {
    /// Equality with integer/float cross-kind coercion.
    ///
    /// Filters treat `1` and `1.0` as the same value; everything else
    /// falls back to structural equality.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) => (*a as f64 - b).abs() < f64::EPSILON,
            (Value::Float(a), Value::Int(b)) => (a - *b as f64).abs() < f64::EPSILON,
            _ => self == other,
        }
    }

    /// Ordered comparison used by range filters and sorting.
    ///
    /// Integers and floats compare across kinds; sequences compare
    /// element-wise, shorter first on a common prefix. Any other
    /// cross-kind pair, and null on either side, is incomparable.
    pub fn compare(&self, other: &Value) -> Result<Ordering, TableError> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => {
                a.partial_cmp(b).ok_or_else(|| incomparable(self, other))
            }
            (Value::Int(a), Value::Float(b)) => (*a as f64)
                .partial_cmp(b)
                .ok_or_else(|| incomparable(self, other)),
            (Value::Float(a), Value::Int(b)) => a
                .partial_cmp(&(*b as f64))
                .ok_or_else(|| incomparable(self, other)),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (left, right) in a.iter().zip(b.iter()) {
                    match left.compare(right)? {
                        Ordering::Equal => continue,
                        decided => return Ok(decided),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            _ => Err(incomparable(self, other)),
        }
    }

    /// Human-readable kind name for error messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

fn incomparable(left: &Value, right: &Value) -> TableError {
    TableError::TypeMismatch(format!(
        "cannot compare {} with {}",
        left.kind(),
        right.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_maps_json_kinds() {
        assert_eq!(Value::from(serde_json::json!(null)), Value::Null);
        assert_eq!(Value::from(serde_json::json!(true)), Value::Bool(true));
        assert_eq!(Value::from(serde_json::json!(42)), Value::Int(42));
        assert_eq!(Value::from(serde_json::json!(1.5)), Value::Float(1.5));
        assert_eq!(
            Value::from(serde_json::json!("hi")),
            Value::Str("hi".to_string())
        );
        assert_eq!(
            Value::from(serde_json::json!([1, "a"])),
            Value::List(vec![Value::Int(1), Value::Str("a".to_string())])
        );
    }

    #[test]
    fn coercion_degrades_oversized_numbers_to_text() {
        let raw = serde_json::json!(u64::MAX);
        assert_eq!(Value::from(raw), Value::Str(u64::MAX.to_string()));
    }

    #[test]
    fn untagged_serde_round_trips_as_plain_json() {
        let value = Value::Map(BTreeMap::from([
            ("age".to_string(), Value::Int(30)),
            ("name".to_string(), Value::Str("Alice".to_string())),
            ("tags".to_string(), Value::List(vec![Value::Null])),
        ]));

        let encoded = serde_json::to_string(&value).unwrap();
        assert_eq!(encoded, r#"{"age":30,"name":"Alice","tags":[null]}"#);

        let decoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn loose_equality_coerces_numbers() {
        assert!(Value::Int(1).loosely_equals(&Value::Float(1.0)));
        assert!(Value::Float(2.0).loosely_equals(&Value::Int(2)));
        assert!(!Value::Int(1).loosely_equals(&Value::Str("1".to_string())));
        assert!(Value::Null.loosely_equals(&Value::Null));
    }

    #[test]
    fn comparison_orders_within_kind() {
        assert_eq!(
            Value::Int(1).compare(&Value::Int(2)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Value::Str("b".to_string())
                .compare(&Value::Str("a".to_string()))
                .unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            Value::Int(3).compare(&Value::Float(2.5)).unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn comparison_of_sequences_is_elementwise() {
        let short = Value::List(vec![Value::Int(1)]);
        let long = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(short.compare(&long).unwrap(), Ordering::Less);
    }

    #[test]
    fn cross_kind_comparison_is_an_error() {
        let result = Value::Str("a".to_string()).compare(&Value::Int(1));
        assert!(matches!(result, Err(TableError::TypeMismatch(_))));

        let result = Value::Null.compare(&Value::Int(1));
        assert!(matches!(result, Err(TableError::TypeMismatch(_))));
    }
}
