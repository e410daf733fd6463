//! Structural comparison of two serialized documents.
//!
//! Both inputs are parsed to canonical values and walked together; every
//! differing leaf produces one report line addressed by its dot path.
//! Masked paths (and everything beneath them) are excluded from the walk.

use serde_json::Value;

use crate::errors::Result;

/// Compare two YAML documents structurally.
///
/// `ignore_paths` entries are dot-separated field paths; a masked path also
/// masks all paths beneath it. Returns an empty string when the documents are
/// structurally identical outside the masked paths.
///
/// # Errors
///
/// Returns `Serialization` if either document cannot be parsed to a canonical
/// value.
pub fn structural_diff(a_yaml: &str, b_yaml: &str, ignore_paths: &[String]) -> Result<String> {
    let a: Value = parse_canonical(a_yaml)?;
    let b: Value = parse_canonical(b_yaml)?;

    let mut lines = Vec::new();
    walk("", Some(&a), Some(&b), ignore_paths, &mut lines);

    if lines.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!("{}\n", lines.join("\n")))
    }
}

fn parse_canonical(yaml: &str) -> Result<Value> {
    if yaml.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_yaml::from_str(yaml)?)
}

fn is_masked(path: &str, ignore_paths: &[String]) -> bool {
    ignore_paths
        .iter()
        .any(|p| path == p || path.starts_with(&format!("{}.", p)))
}

fn child_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", parent, segment)
    }
}

fn walk(
    path: &str,
    a: Option<&Value>,
    b: Option<&Value>,
    ignore_paths: &[String],
    lines: &mut Vec<String>,
) {
    if is_masked(path, ignore_paths) {
        return;
    }
    match (a, b) {
        (Some(Value::Object(ao)), Some(Value::Object(bo))) => {
            let mut keys: Vec<&String> = ao.keys().chain(bo.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                walk(
                    &child_path(path, key),
                    ao.get(key),
                    bo.get(key),
                    ignore_paths,
                    lines,
                );
            }
        }
        (Some(Value::Array(aa)), Some(Value::Array(ba))) => {
            for i in 0..aa.len().max(ba.len()) {
                walk(
                    &child_path(path, &i.to_string()),
                    aa.get(i),
                    ba.get(i),
                    ignore_paths,
                    lines,
                );
            }
        }
        (Some(av), Some(bv)) => {
            if av != bv {
                lines.push(format_line(path, Some(av), Some(bv)));
            }
        }
        (Some(av), None) => lines.push(format_line(path, Some(av), None)),
        (None, Some(bv)) => lines.push(format_line(path, None, Some(bv))),
        (None, None) => {}
    }
}

fn format_line(path: &str, a: Option<&Value>, b: Option<&Value>) -> String {
    let display = |v: Option<&Value>| match v {
        Some(v) => v.to_string(),
        None => "<none>".to_string(),
    };
    let path = if path.is_empty() { "<root>" } else { path };
    format!("{}: {} -> {}", path, display(a), display(b))
}
