//! Dynamic value model for query bindings and result cells.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::pattern;

/// A loosely-typed value crossing the bridge in either direction: bound into
/// a query, or decoded out of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL. Carries no type of its own, so it is bound as a text-typed
    /// parameter; when the target column is not textual, keep an explicit
    /// cast on the placeholder (`:col::int8`) — casts survive rewriting and
    /// retype the NULL server-side.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
}

impl Value {
    /// Best-effort coercion into a more specific type. Never fails.
    ///
    /// Strings are shape-tested against the canonical UUID layout before any
    /// parse is attempted, so the common case of a non-UUID string costs one
    /// anchored regex check. A string that looks like a UUID but fails the
    /// strict parse is legal application data and passes through unchanged.
    pub fn coerce(self) -> Value {
        match self {
            Value::Text(s) if pattern::is_uuid_shaped(&s) => match Uuid::parse_str(&s) {
                Ok(uuid) => Value::Uuid(uuid),
                Err(_) => Value::Text(s),
            },
            other => other,
        }
    }

    /// Whether this is the SQL NULL value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The text content, if this value is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        let _b: Value = true.into();
        let _i: Value = 42i32.into();
        let _f: Value = 3.14f64.into();
        let _s: Value = "hello".into();
        let _n: Value = Option::<i64>::None.into();
    }

    #[test]
    fn test_coerce_valid_uuid() {
        let v = Value::Text("550e8400-e29b-41d4-a716-446655440000".into()).coerce();
        match v {
            Value::Uuid(u) => {
                assert_eq!(u.to_string(), "550e8400-e29b-41d4-a716-446655440000");
            }
            other => panic!("expected Uuid, got {:?}", other),
        }
    }

    #[test]
    fn test_coerce_uppercase_uuid() {
        let v = Value::Text("550E8400-E29B-41D4-A716-446655440000".into()).coerce();
        match v {
            // Canonical form is lowercase; input matched case-insensitively.
            Value::Uuid(u) => {
                assert_eq!(u.to_string(), "550e8400-e29b-41d4-a716-446655440000");
            }
            other => panic!("expected Uuid, got {:?}", other),
        }
    }

    #[test]
    fn test_coerce_lookalike_passes_through() {
        let s = "550e8400-xyzb-41d4-a716-zzzz55440000";
        let v = Value::Text(s.into()).coerce();
        assert_eq!(v, Value::Text(s.into()));
    }

    #[test]
    fn test_coerce_non_string_untouched() {
        assert_eq!(Value::Int(7).coerce(), Value::Int(7));
        assert_eq!(Value::Null.coerce(), Value::Null);
    }
}
