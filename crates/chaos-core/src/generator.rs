//! Destructive argument generation.
//!
//! For one argument position, produces every value the engine will
//! substitute for the example: the `generals` baseline, the catalog entries
//! named by the descriptor, and for structured descriptors one mutated copy
//! of the example per generated field value.

use tracing::{debug, warn};

use crate::catalog::{CatalogOverlay, DestructiveCatalog, OBJECT};
use crate::descriptor::TypeDescriptor;
use crate::value::Value;

/// Generate the deduplicated, ordered destructive variants for `example`.
pub fn generate(
    descriptor: &TypeDescriptor,
    example: &Value,
    overlay: &CatalogOverlay,
) -> Vec<Value> {
    let catalog = DestructiveCatalog::merged(overlay);
    let variants = generate_with(&catalog, descriptor, example);
    debug!(
        descriptor = %descriptor,
        variants = variants.len(),
        "generated destructive variants"
    );
    variants
}

fn generate_with(
    catalog: &DestructiveCatalog,
    descriptor: &TypeDescriptor,
    example: &Value,
) -> Vec<Value> {
    let mut out: Vec<Value> = catalog.generals().to_vec();

    match descriptor {
        TypeDescriptor::Union(parts) => {
            for part in parts {
                let branch = TypeDescriptor::Primitive(part.clone());
                out.extend(generate_with(catalog, &branch, example));
            }
        }
        TypeDescriptor::Primitive(name) => {
            // Unknown categories fall back to the baseline.
            if let Some(values) = catalog.get(name.trim()) {
                out.extend_from_slice(values);
            }
        }
        TypeDescriptor::Struct(fields) => {
            out.extend_from_slice(catalog.get(OBJECT).unwrap_or_default());
            for (name, field_descriptor) in fields {
                let field_example = example.field(name).cloned().unwrap_or_default();
                for variant in generate_with(catalog, field_descriptor, &field_example) {
                    out.push(example.with_field(name, variant));
                }
            }
        }
        TypeDescriptor::Unknown => {
            warn!(example = %example, "unknown descriptor, using baseline destructive values");
        }
    }

    dedup(out)
}

/// Drop structurally equal values, keeping the first occurrence.
pub fn dedup(values: Vec<Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}
