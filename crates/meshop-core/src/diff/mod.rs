//! Manifest diff engine.
//!
//! Compares two renderings of a cluster state after optional rename, select
//! and ignore filtering. The entry points are [`diff_manifests`] and
//! [`diff_manifests_with_rename_select_ignore`]; both return a report string
//! that is empty iff no differences were found.

use std::collections::BTreeMap;

use regex::Regex;

use crate::errors::{MeshopError, Result};
use crate::object::{MeshObject, ObjectSet};

mod compare;

pub use compare::structural_diff;

/// A `from->to` rename rule over identity keys. Both sides are 3-component
/// `kind:namespace:name` patterns where `*` or an empty component is a
/// wildcard.
#[derive(Debug, Clone, PartialEq)]
pub struct RenameRule {
    pub from: String,
    pub to: String,
}

/// One select/ignore entry: a 3-component identity pattern, optionally
/// carrying a field path to mask instead of ignoring the whole object.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternEntry {
    pub pattern: String,
    pub path: Option<String>,
}

/// Parse comma-separated `from->to` rename rules.
/// Entries without exactly one `->` are silently skipped.
pub fn parse_rename_rules(rules: &str) -> Vec<RenameRule> {
    if rules.is_empty() {
        return Vec::new();
    }
    rules
        .split(',')
        .filter_map(|entry| {
            let parts: Vec<&str> = entry.split("->").collect();
            if parts.len() != 2 {
                return None;
            }
            Some(RenameRule {
                from: parts[0].trim().to_string(),
                to: parts[1].trim().to_string(),
            })
        })
        .collect()
}

/// Parse comma-separated select/ignore patterns.
///
/// Entries with at least 4 colon-delimited segments carry a field path in the
/// 4th segment; shorter entries are whole-object patterns with no path
/// restriction.
pub fn parse_pattern_entries(patterns: &str) -> Vec<PatternEntry> {
    if patterns.is_empty() {
        return Vec::new();
    }
    patterns
        .split(',')
        .map(|entry| {
            let segments: Vec<&str> = entry.splitn(4, ':').collect();
            if segments.len() < 4 {
                PatternEntry {
                    pattern: entry.trim().to_string(),
                    path: None,
                }
            } else {
                PatternEntry {
                    pattern: format!("{}:{}:{}", segments[0], segments[1], segments[2])
                        .trim()
                        .to_string(),
                    path: Some(segments[3].to_string()),
                }
            }
        })
        .collect()
}

/// Translate a colon-delimited resource indicator to a regular expression.
/// Components equal to `*` or the empty string become wildcards.
fn compile_pattern(pattern: &str) -> Result<Regex> {
    let translated: Vec<&str> = pattern
        .trim()
        .split(':')
        .map(|seg| if seg.is_empty() || seg == "*" { ".*" } else { seg })
        .collect();
    Regex::new(&translated.join(":")).map_err(|e| MeshopError::MalformedPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Apply rename rules to the keys of an identity index.
///
/// Rules are tested in order against each key; the first matching rule
/// rewrites the key, substituting each `to` component and inheriting the
/// original value wherever the `to` component is a wildcard. A renamed key is
/// not tested against further rules; unmatched keys pass through unchanged.
///
/// # Errors
///
/// Returns `MalformedPattern` when a rule side does not compile or is not a
/// 3-component indicator.
pub fn rename_keys(
    index: BTreeMap<String, MeshObject>,
    rules: &[RenameRule],
) -> Result<BTreeMap<String, MeshObject>> {
    if rules.is_empty() {
        return Ok(index);
    }
    let mut out = BTreeMap::new();
    for (key, obj) in index {
        let mut target = key.clone();
        for rule in rules {
            let from_re = compile_pattern(&rule.from)?;
            if !from_re.is_match(&key) {
                continue;
            }
            let from_parts: Vec<&str> = key.split(':').collect();
            let to_parts: Vec<&str> = rule.to.split(':').collect();
            if from_parts.len() != 3 || to_parts.len() != 3 {
                return Err(MeshopError::MalformedPattern {
                    pattern: rule.to.clone(),
                    reason: "rename sides must have 3 colon-delimited components".to_string(),
                });
            }
            let renamed: Vec<&str> = to_parts
                .iter()
                .zip(&from_parts)
                .map(|(to, from)| {
                    if to.is_empty() || *to == "*" {
                        *from
                    } else {
                        *to
                    }
                })
                .collect();
            target = renamed.join(":");
            break;
        }
        out.insert(target, obj);
    }
    Ok(out)
}

/// Filter an identity index with select (OR semantics) then ignore patterns.
///
/// An empty select list leaves the index unchanged; whole-object ignore
/// entries then remove any matching key. Path-carrying ignore entries do not
/// remove objects here; they mask fields during comparison.
///
/// # Errors
///
/// Returns `MalformedPattern` when a pattern does not compile.
pub fn filter_select_ignore(
    index: &BTreeMap<String, MeshObject>,
    selects: &[PatternEntry],
    ignores: &[PatternEntry],
) -> Result<BTreeMap<String, MeshObject>> {
    let mut out = BTreeMap::new();
    if selects.is_empty() {
        out = index.clone();
    } else {
        for entry in selects {
            let re = compile_pattern(&entry.pattern)?;
            for (key, obj) in index {
                if re.is_match(key) {
                    out.insert(key.clone(), obj.clone());
                }
            }
        }
    }
    for entry in ignores.iter().filter(|e| e.path.is_none()) {
        let re = compile_pattern(&entry.pattern)?;
        out.retain(|key, _| !re.is_match(key));
    }
    Ok(out)
}

/// Field paths to mask for a given key: the union of path entries from every
/// ignore rule whose name portion matches the key.
fn ignore_paths_for(key: &str, ignores: &[PatternEntry]) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for entry in ignores {
        let Some(path) = &entry.path else { continue };
        let re = compile_pattern(&entry.pattern)?;
        if re.is_match(key) {
            paths.push(path.clone());
        }
    }
    Ok(paths)
}

/// Diff two manifest texts with no filtering.
///
/// # Errors
///
/// Returns `Serialization` if a surviving object cannot be rendered for
/// comparison.
pub fn diff_manifests(a: &str, b: &str, verbose: bool) -> Result<String> {
    let mut aom = ObjectSet::parse(a).to_identity_map();
    let mut bom = ObjectSet::parse(b).to_identity_map();
    manifest_diff(&mut aom, &mut bom, &[], verbose)
}

/// Diff two manifest texts after rename, select and ignore filtering.
///
/// Renames apply to A's index only; select (applied first) and ignore filter
/// both indexes; path-carrying ignore entries mask fields during comparison
/// unless `verbose` is set.
///
/// # Errors
///
/// Returns `MalformedPattern` for bad rename/select/ignore indicators and
/// `Serialization` if an object cannot be rendered for comparison.
pub fn diff_manifests_with_rename_select_ignore(
    a: &str,
    b: &str,
    renames: &str,
    selects: &str,
    ignores: &str,
    verbose: bool,
) -> Result<String> {
    let rules = parse_rename_rules(renames);
    let select_entries = parse_pattern_entries(selects);
    let ignore_entries = parse_pattern_entries(ignores);

    let aom = rename_keys(ObjectSet::parse(a).to_identity_map(), &rules)?;
    let bom = ObjectSet::parse(b).to_identity_map();

    let mut aom = filter_select_ignore(&aom, &select_entries, &ignore_entries)?;
    let mut bom = filter_select_ignore(&bom, &select_entries, &ignore_entries)?;

    manifest_diff(&mut aom, &mut bom, &ignore_entries, verbose)
}

/// Compare two filtered identity indexes and assemble the report in
/// lexicographic key order.
fn manifest_diff(
    aom: &mut BTreeMap<String, MeshObject>,
    bom: &mut BTreeMap<String, MeshObject>,
    ignores: &[PatternEntry],
    verbose: bool,
) -> Result<String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();

    for (ak, av) in aom.iter_mut() {
        let Some(bv) = bom.get_mut(ak) else {
            out.insert(ak.clone(), format!("\n\nObject {} is missing in B:\n\n", ak));
            continue;
        };
        let ay = av.to_yaml()?;
        let by = bv.to_yaml()?;
        let diff = if verbose {
            structural_diff(&ay, &by, &[])?
        } else {
            let masks = ignore_paths_for(ak, ignores)?;
            structural_diff(&ay, &by, &masks)?
        };
        if !diff.is_empty() {
            out.insert(ak.clone(), format!("\n\nObject {} has diffs:\n\n{}", ak, diff));
        }
    }

    for bk in bom.keys() {
        if !aom.contains_key(bk) {
            out.insert(bk.clone(), format!("\n\nObject {} is missing in A:\n\n", bk));
        }
    }

    Ok(out.into_values().collect())
}
