//! Type descriptors: the shape contract for an argument or return value.
//!
//! A descriptor is inferred from an example with [`infer`] or declared by the
//! caller, and checked against values with [`matches`].

use serde::{Deserialize, Deserializer};
use std::fmt;

use crate::catalog::{is_builtin_category, CatalogOverlay};
use crate::value::Value;

/// Separator between the parts of a union descriptor.
pub const UNION_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// A runtime category name or a caller-defined catalog category.
    Primitive(String),
    /// Any of the listed names.
    Union(Vec<String>),
    /// Own fields of a plain mapping, in declaration order.
    Struct(Vec<(String, TypeDescriptor)>),
    /// Opaque shape (sequences, null, anything without a usable contract).
    Unknown,
}

impl TypeDescriptor {
    /// Parse a textual descriptor: `"a | b"` becomes a union of trimmed
    /// parts, anything else a trimmed primitive name.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.contains(UNION_SEPARATOR) {
            TypeDescriptor::Union(
                text.split(UNION_SEPARATOR)
                    .map(|part| part.trim().to_string())
                    .collect(),
            )
        } else {
            TypeDescriptor::Primitive(text.to_string())
        }
    }

    /// Build a descriptor from its JSON form: strings parse as above, objects
    /// become structured descriptors, everything else is [`Unknown`].
    ///
    /// [`Unknown`]: TypeDescriptor::Unknown
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Object(map) => TypeDescriptor::Struct(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
            _ => TypeDescriptor::Unknown,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TypeDescriptor::Primitive(name) => serde_json::Value::String(name.clone()),
            TypeDescriptor::Union(parts) => {
                serde_json::Value::String(parts.join(&UNION_SEPARATOR.to_string()))
            }
            TypeDescriptor::Struct(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            TypeDescriptor::Unknown => serde_json::Value::String("unknown".into()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TypeDescriptor::Unknown)
    }
}

impl From<&str> for TypeDescriptor {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(name) => write!(f, "{}", name),
            TypeDescriptor::Unknown => write!(f, "unknown"),
            _ => write!(f, "{}", self.to_json()),
        }
    }
}

/// Deserializes from the JSON form accepted by [`TypeDescriptor::from_json`].
impl<'de> Deserialize<'de> for TypeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(|v| Self::from_json(&v))
    }
}

/// Infer a descriptor from an example.
///
/// Fields whose own descriptor would be opaque are left out of structured
/// descriptors, so `matches(&infer(e), e, _)` holds for every non-opaque `e`.
pub fn infer(example: &Value) -> TypeDescriptor {
    match example {
        Value::Object(fields) => TypeDescriptor::Struct(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), infer(v)))
                .filter(|(_, d)| !d.is_unknown())
                .collect(),
        ),
        Value::Null | Value::Array(_) => TypeDescriptor::Unknown,
        other => TypeDescriptor::Primitive(other.type_name().to_string()),
    }
}

/// Check `value` against `descriptor`. An absent descriptor never matches.
pub fn matches_declared(
    descriptor: Option<&TypeDescriptor>,
    value: &Value,
    overlay: &CatalogOverlay,
) -> bool {
    descriptor.is_some_and(|d| matches(d, value, overlay))
}

/// Check `value` against `descriptor`.
///
/// A name that is not a built-in category but has a sequence in `overlay`
/// is a caller-defined alias and accepts any value.
pub fn matches(descriptor: &TypeDescriptor, value: &Value, overlay: &CatalogOverlay) -> bool {
    match descriptor {
        TypeDescriptor::Primitive(name) => matches_name(name, value, overlay),
        TypeDescriptor::Union(parts) => parts
            .iter()
            .any(|part| matches_name(part, value, overlay)),
        TypeDescriptor::Struct(fields) => {
            value.is_plain_object()
                && fields.iter().all(|(name, field_desc)| {
                    value
                        .field(name)
                        .is_some_and(|field| matches(field_desc, field, overlay))
                })
        }
        TypeDescriptor::Unknown => false,
    }
}

fn matches_name(name: &str, value: &Value, overlay: &CatalogOverlay) -> bool {
    let name = name.trim();
    let is_alias = !is_builtin_category(name) && overlay.sequence(name).is_some();
    is_alias || value.type_name() == name
}
