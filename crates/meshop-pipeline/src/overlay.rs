//! Override tree construction.
//!
//! Turns a list of `path=value` overrides into a nested YAML tree ready for
//! merging over a base specification. Every write is validated against the
//! specification schema through the injected validator.

use serde_yaml::{Mapping, Value};
use tracing::warn;

use meshop_core::errors::{MeshopError, Result};

use crate::generate::SpecValidator;

/// Namespace seeded into every non-empty override tree so that most override
/// lists work without the caller spelling it out.
pub const DEFAULT_NAMESPACE: &str = "istio-system";

/// Build a nested override tree from `path=value` strings.
///
/// Each entry must contain exactly one `=`; a malformed entry is a hard error
/// and no partial tree is returned. Values are parsed with scalar type
/// inference (bool, integer, float, else string). A default namespace is
/// seeded first for convenience. After every write the accumulated tree is
/// serialized and checked by `validator`; a validation failure aborts unless
/// `strict` is false, in which case it is logged and construction continues.
///
/// An empty override list yields an empty tree with no seeding.
///
/// # Errors
///
/// Returns `MalformedOverride` for bad entries and `Validation` when a write
/// produces a spec the validator rejects (strict mode only).
pub fn build_override_tree(
    overrides: &[String],
    strict: bool,
    validator: &dyn SpecValidator,
) -> Result<Value> {
    if overrides.is_empty() {
        return Ok(Value::Mapping(Mapping::new()));
    }

    let mut tree = Mapping::new();
    write_path(&mut tree, "defaultNamespace", Value::from(DEFAULT_NAMESPACE));

    for entry in overrides {
        let parts: Vec<&str> = entry.split('=').collect();
        if parts.len() != 2 {
            return Err(MeshopError::MalformedOverride {
                entry: entry.clone(),
            });
        }
        write_path(&mut tree, parts[0], parse_scalar(parts[1]));

        // Test the accumulated tree immediately so a bad path is reported
        // against the entry that introduced it.
        let rendered = serde_yaml::to_string(&Value::Mapping(tree.clone()))?;
        if let Err(err) = validator.validate(&rendered) {
            if strict {
                return Err(MeshopError::Validation {
                    reason: format!("bad path=value {}: {}", entry, err),
                });
            }
            warn!(entry = %entry, error = %err, "override failed validation, continuing");
        }
    }

    Ok(Value::Mapping(tree))
}

/// Parse a scalar override value with type inference.
pub fn parse_scalar(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::from(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }
    Value::from(raw)
}

/// Write a value into the tree at a dot-separated path, creating intermediate
/// mappings as needed. Only dot-separated segments are recognized; richer
/// path grammars are an external concern.
fn write_path(tree: &mut Mapping, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = tree;
    while let Some(segment) = segments.next() {
        let key = Value::from(segment);
        if segments.peek().is_none() {
            current.insert(key, value);
            return;
        }
        if !current.get(&key).map(Value::is_mapping).unwrap_or(false) {
            current.insert(key.clone(), Value::Mapping(Mapping::new()));
        }
        current = match current.get_mut(&key).and_then(Value::as_mapping_mut) {
            Some(next) => next,
            None => return,
        };
    }
}
