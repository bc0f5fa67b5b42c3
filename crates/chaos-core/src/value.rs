//! Dynamic value model for examples, destructive values, inputs and outputs.
//!
//! Destructive values deliberately include things JSON cannot carry
//! (`undefined`, `NaN`, `±Infinity`), so the engine works on its own
//! [`Value`] rather than `serde_json::Value`.
//!
//! Equality is structural: `NaN` equals `NaN`, and two mappings are equal when
//! they hold the same fields with equal values regardless of field order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 2^63; integral doubles below this magnitude fit an `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The "absent value" sentinel.
    #[default]
    Undefined,
    /// The "no value" sentinel.
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// A plain mapping; fields keep insertion order.
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Runtime category name, following `typeof` semantics: `null` and
    /// sequences both report `"object"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True for a plain mapping (not null, not a sequence).
    pub fn is_plain_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Own field lookup on a plain mapping.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Copy of this mapping with exactly one field replaced (or appended when
    /// absent). A non-mapping receiver is treated as an empty mapping.
    pub fn with_field(&self, name: &str, value: Value) -> Value {
        let mut fields = match self {
            Value::Object(fields) => fields.clone(),
            _ => Vec::new(),
        };
        match fields.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => fields.push((name.to_string(), value)),
        }
        Value::Object(fields)
    }

    /// JSON rendering. Values JSON cannot express are rendered by name:
    /// `"undefined"`, `"NaN"`, `"Infinity"`, `"-Infinity"`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined => serde_json::Value::String("undefined".into()),
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_nan() {
        return serde_json::Value::String("NaN".into());
    }
    if n.is_infinite() {
        let name = if n > 0.0 { "Infinity" } else { "-Infinity" };
        return serde_json::Value::String(name.into());
    }
    if n.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&n) {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| other.field(k).is_some_and(|w| v == w))
                    && b.iter().all(|(k, _)| self.field(k).is_some())
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Bare sentinels read better unquoted in messages.
            Value::Undefined => write!(f, "undefined"),
            Value::Number(n) if !n.is_finite() => match number_to_json(*n) {
                serde_json::Value::String(s) => write!(f, "{}", s),
                other => write!(f, "{}", other),
            },
            _ => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_name_follows_typeof() {
        assert_eq!(Value::Undefined.type_name(), "undefined");
        assert_eq!(Value::Null.type_name(), "object");
        assert_eq!(Value::Array(vec![]).type_name(), "object");
        assert_eq!(Value::from(4).type_name(), "number");
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::from(true).type_name(), "boolean");
    }

    #[test]
    fn test_nan_equals_nan() {
        assert_eq!(Value::Number(f64::NAN), Value::Number(f64::NAN));
        assert_ne!(Value::Number(f64::NAN), Value::Number(1.0));
    }

    #[test]
    fn test_object_equality_ignores_field_order() {
        let a = Value::from(json!({"a": 1, "b": {"c": "x"}}));
        let b = Value::from(json!({"b": {"c": "x"}, "a": 1}));
        assert_eq!(a, b);
        assert_ne!(a, Value::from(json!({"a": 1})));
    }

    #[test]
    fn test_null_and_undefined_are_distinct() {
        assert_ne!(Value::Null, Value::Undefined);
    }

    #[test]
    fn test_with_field_replaces_only_one_field() {
        let example = Value::from(json!({"a": 5, "b": "hello"}));
        let mutated = example.with_field("a", Value::Null);
        assert_eq!(mutated.field("a"), Some(&Value::Null));
        assert_eq!(mutated.field("b"), Some(&Value::from("hello")));
        assert_eq!(example.field("a"), Some(&Value::from(5)));
    }

    #[test]
    fn test_to_json_names_special_values() {
        let v = Value::Array(vec![
            Value::Undefined,
            Value::Number(f64::NAN),
            Value::Number(f64::INFINITY),
            Value::Number(f64::NEG_INFINITY),
            Value::from(4),
        ]);
        assert_eq!(
            v.to_json(),
            json!(["undefined", "NaN", "Infinity", "-Infinity", 4])
        );
    }

    #[test]
    fn test_large_integers_render_as_integers() {
        let past_safe = Value::Number(10_007_199_254_740_992.0);
        assert_eq!(past_safe.to_json(), json!(10_007_199_254_740_992_i64));
        assert_eq!(past_safe.to_string(), "10007199254740992");
        assert_eq!(Value::Number(2e18).to_string(), "2000000000000000000");
        assert_eq!(Value::Number(-2e18).to_string(), "-2000000000000000000");
        // Outside the i64 range the float form is kept.
        assert_eq!(Value::Number(1e20).to_json(), json!(1e20));
        assert_eq!(Value::Number(0.5).to_string(), "0.5");
    }

    #[test]
    fn test_display_is_compact_json() {
        assert_eq!(Value::from(json!({"a": [1, 2]})).to_string(), r#"{"a":[1,2]}"#);
        assert_eq!(Value::Undefined.to_string(), "undefined");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
    }
}
