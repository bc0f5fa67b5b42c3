//! Destructive value catalog.
//!
//! The built-in catalog is a process-wide constant. Callers layer a
//! [`CatalogOverlay`] on top of it; merging happens on demand and never
//! touches either side.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use tracing::warn;

use crate::value::Value;

/// Category applied to every argument position regardless of its type.
pub const GENERALS: &str = "generals";
/// Category used for whole-value substitution of structured arguments.
pub const OBJECT: &str = "object";

/// Names of the built-in categories, in catalog order.
pub const BUILTIN_CATEGORIES: [&str; 5] = ["string", "number", "boolean", OBJECT, GENERALS];

/// Above 2^53, where doubles stop representing every integer.
const PAST_SAFE_INTEGER: f64 = 10_007_199_254_740_992.0;
/// Far outside the safe integer range.
const HUGE_INTEGER: f64 = 2_000_000_000_000_000_000.0;

pub static DEFAULT_CATALOG: LazyLock<DestructiveCatalog> = LazyLock::new(|| {
    let mut categories = BTreeMap::new();
    categories.insert(
        "string".to_string(),
        vec![
            Value::from(""),
            Value::from("   "),
            Value::from("13467"),
            Value::Array(vec![]),
        ],
    );
    categories.insert(
        "number".to_string(),
        vec![
            Value::from(-1),
            Value::Number(f64::INFINITY),
            Value::Number(f64::NEG_INFINITY),
            Value::Number(f64::NAN),
            Value::Number(PAST_SAFE_INTEGER),
        ],
    );
    categories.insert(
        "boolean".to_string(),
        vec![
            Value::from(1),
            Value::from(0),
            Value::from(""),
            Value::Array(vec![]),
        ],
    );
    categories.insert(
        OBJECT.to_string(),
        vec![
            Value::Object(vec![]),
            Value::Array(vec![]),
            Value::Object(vec![("destroy".to_string(), Value::from("24"))]),
            Value::Number(HUGE_INTEGER),
        ],
    );
    categories.insert(GENERALS.to_string(), vec![Value::Null, Value::Undefined]);
    DestructiveCatalog { categories }
});

pub fn is_builtin_category(name: &str) -> bool {
    BUILTIN_CATEGORIES.contains(&name)
}

/// Named, ordered collections of destructive values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DestructiveCatalog {
    categories: BTreeMap<String, Vec<Value>>,
}

impl DestructiveCatalog {
    pub fn get(&self, category: &str) -> Option<&[Value]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn generals(&self) -> &[Value] {
        self.get(GENERALS).unwrap_or_default()
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Merge the built-in defaults with `overlay`.
    ///
    /// Built-in categories get the overlay's sequence appended after the
    /// defaults; overlay-only categories are taken as-is. Entries that are
    /// not sequences are skipped with a warning.
    pub fn merged(overlay: &CatalogOverlay) -> DestructiveCatalog {
        let mut categories = DEFAULT_CATALOG.categories.clone();
        for (name, raw) in overlay.iter() {
            let Some(extra) = raw.as_array() else {
                warn!(
                    category = %name,
                    value = %raw,
                    "destructive values must be a sequence, using defaults"
                );
                continue;
            };
            categories
                .entry(name.clone())
                .or_default()
                .extend(extra.iter().cloned());
        }
        DestructiveCatalog { categories }
    }
}

/// Caller-supplied destructive values, keyed by category.
///
/// Entries are stored unvalidated so a malformed overlay can still be
/// inspected; [`CatalogOverlay::invalid_entries`] reports which ones are not
/// sequences.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogOverlay {
    entries: BTreeMap<String, Value>,
}

impl CatalogOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: impl Into<String>, values: Value) -> &mut Self {
        self.entries.insert(category.into(), values);
        self
    }

    /// Builder-style insert of a proper sequence.
    pub fn with(mut self, category: impl Into<String>, values: Vec<Value>) -> Self {
        self.entries.insert(category.into(), Value::Array(values));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The sequence registered under `category`, if it is a proper sequence.
    pub fn sequence(&self, category: &str) -> Option<&[Value]> {
        self.entries.get(category).and_then(Value::as_array)
    }

    /// Categories whose value is not a sequence.
    pub fn invalid_entries(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, v)| v.as_array().is_none())
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

impl FromIterator<(String, Value)> for CatalogOverlay {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, Value>> for CatalogOverlay {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl From<BTreeMap<String, serde_json::Value>> for CatalogOverlay {
    fn from(entries: BTreeMap<String, serde_json::Value>) -> Self {
        entries
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_categories() {
        assert_eq!(DEFAULT_CATALOG.len(), 5);
        for name in BUILTIN_CATEGORIES {
            assert!(DEFAULT_CATALOG.get(name).is_some(), "missing {}", name);
        }
        assert_eq!(DEFAULT_CATALOG.generals(), &[Value::Null, Value::Undefined]);
        assert_eq!(DEFAULT_CATALOG.get("number").unwrap().len(), 5);
    }

    #[test]
    fn test_merge_appends_after_defaults() {
        let overlay = CatalogOverlay::new().with("number", vec![3.into(), 0.into(), 9.into()]);
        let merged = DestructiveCatalog::merged(&overlay);
        let numbers = merged.get("number").unwrap();
        assert_eq!(numbers.len(), 8);
        assert_eq!(&numbers[..5], DEFAULT_CATALOG.get("number").unwrap());
        assert_eq!(numbers[5], Value::from(3));
    }

    #[test]
    fn test_merge_accepts_custom_category() {
        let overlay = CatalogOverlay::new().with("email", vec!["@".into()]);
        let merged = DestructiveCatalog::merged(&overlay);
        assert_eq!(merged.get("email"), Some(&[Value::from("@")][..]));
    }

    #[test]
    fn test_merge_skips_non_sequences() {
        let mut overlay = CatalogOverlay::new();
        overlay.insert("string", Value::from(23));
        overlay.insert("custom", Value::from("  test  "));
        let merged = DestructiveCatalog::merged(&overlay);
        assert_eq!(merged.get("string"), DEFAULT_CATALOG.get("string"));
        assert!(merged.get("custom").is_none());
        assert_eq!(overlay.invalid_entries(), vec!["custom", "string"]);
    }

    #[test]
    fn test_merge_does_not_touch_defaults() {
        let overlay = CatalogOverlay::new().with("generals", vec![Value::from(false)]);
        let merged = DestructiveCatalog::merged(&overlay);
        assert_eq!(merged.generals().len(), 3);
        assert_eq!(DEFAULT_CATALOG.generals().len(), 2);
    }
}
