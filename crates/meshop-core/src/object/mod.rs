//! Manifest object model.
//!
//! A [`MeshObject`] is an in-memory representation of a single cluster
//! resource, used for moving between different representations (structured
//! value, canonical JSON, textual YAML) with explicit, cache-invalidated
//! serialized forms.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use crate::errors::{MeshopError, Result};

mod set;

pub use set::ObjectSet;

/// Kinds that are cluster-scoped: their identity key carries an empty
/// namespace regardless of what the document declares.
pub const CLUSTER_SCOPED_KINDS: &[&str] = &["ClusterRole", "ClusterRoleBinding"];

/// Identity key (`kind:namespace:name`) used to correlate the same logical
/// resource across two renderings. Cluster-scoped kinds force the namespace
/// component to empty.
pub fn identity_key(kind: &str, namespace: &str, name: &str) -> String {
    let namespace = if CLUSTER_SCOPED_KINDS.contains(&kind) {
        ""
    } else {
        namespace
    };
    format!("{}:{}:{}", kind, namespace, name)
}

/// Namespace-insensitive key (`kind:name`).
pub fn name_kind_key(kind: &str, name: &str) -> String {
    format!("{}:{}", kind, name)
}

/// One structured cluster-resource document plus derived identity and cached
/// serializations.
///
/// Identity attributes are derived at construction and immutable afterwards;
/// the only mutating operation is [`MeshObject::merge_labels`], which clears
/// both serialization caches.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshObject {
    /// API group, derived from the `apiVersion` field (empty for core kinds)
    pub group: String,

    /// Resource kind (empty if the document carries none)
    pub kind: String,

    /// Resource name from `metadata.name`
    pub name: String,

    /// Resource namespace as declared by `metadata.namespace`; identity keys
    /// for cluster-scoped kinds ignore it
    pub namespace: String,

    /// The underlying structured document
    value: Value,

    /// Cached canonical JSON form, cleared on mutation
    json: Option<String>,

    /// Cached textual YAML form, cleared on mutation
    yaml: Option<String>,
}

impl MeshObject {
    /// Build an object from an already-parsed structured value, deriving its
    /// identity attributes. Neither cache is seeded.
    pub fn from_value(value: Value) -> Self {
        let api_version = str_at(&value, &["apiVersion"]);
        let group = match api_version.split_once('/') {
            Some((group, _version)) => group.to_string(),
            None => String::new(),
        };
        Self {
            group,
            kind: str_at(&value, &["kind"]),
            name: str_at(&value, &["metadata", "name"]),
            namespace: str_at(&value, &["metadata", "namespace"]),
            value,
            json: None,
            yaml: None,
        }
    }

    /// Parse a single YAML document. The source text seeds the YAML cache.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the document is not valid YAML.
    pub fn parse_yaml(doc: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(doc)?;
        let mut obj = Self::from_value(value);
        obj.yaml = Some(doc.to_string());
        Ok(obj)
    }

    /// Parse a single JSON document. The source text seeds the JSON cache.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the document is not valid JSON.
    pub fn parse_json(doc: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(doc).map_err(MeshopError::from)?;
        let mut obj = Self::from_value(value);
        obj.json = Some(doc.to_string());
        Ok(obj)
    }

    /// The underlying structured document.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Identity key for this object (`kind:namespace:name`).
    pub fn identity_key(&self) -> String {
        identity_key(&self.kind, &self.namespace, &self.name)
    }

    /// Namespace-insensitive key for this object (`kind:name`).
    pub fn name_kind_key(&self) -> String {
        name_kind_key(&self.kind, &self.name)
    }

    /// An object is valid iff kind and name are both non-empty.
    pub fn valid(&self) -> bool {
        !self.kind.is_empty() && !self.name.is_empty()
    }

    /// Canonical JSON form, computed on first use and cached.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the document cannot be represented as JSON
    /// (e.g. non-string mapping keys).
    pub fn to_json(&mut self) -> Result<String> {
        if let Some(json) = &self.json {
            return Ok(json.clone());
        }
        let converted: serde_json::Value = serde_json::to_value(&self.value)?;
        let json = serde_json::to_string(&converted)?;
        self.json = Some(json.clone());
        Ok(json)
    }

    /// Textual YAML form, computed on first use and cached.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the document cannot be re-serialized.
    pub fn to_yaml(&mut self) -> Result<String> {
        if let Some(yaml) = &self.yaml {
            return Ok(yaml.clone());
        }
        let yaml = serde_yaml::to_string(&self.value)?;
        self.yaml = Some(yaml.clone());
        Ok(yaml)
    }

    /// Merge labels into `metadata.labels`, overriding existing keys.
    /// Both serialization caches are invalidated.
    pub fn merge_labels(&mut self, labels: &BTreeMap<String, String>) {
        if let Some(root) = self.value.as_mapping_mut() {
            let metadata = mapping_child(root, "metadata");
            let existing = mapping_child(metadata, "labels");
            for (k, v) in labels {
                existing.insert(Value::from(k.as_str()), Value::from(v.as_str()));
            }
        }
        self.json = None;
        self.yaml = None;
    }
}

/// Fetch a nested mapping child, inserting an empty mapping if absent or if
/// the existing value is not a mapping.
fn mapping_child<'a>(parent: &'a mut Mapping, key: &str) -> &'a mut Mapping {
    let key = Value::from(key);
    if !parent.get(&key).map(Value::is_mapping).unwrap_or(false) {
        parent.insert(key.clone(), Value::Mapping(Mapping::new()));
    }
    parent
        .get_mut(&key)
        .and_then(Value::as_mapping_mut)
        .expect("child mapping was just inserted")
}

/// String at a nested path, or empty when absent or not a string.
fn str_at(value: &Value, path: &[&str]) -> String {
    let mut cur = value;
    for seg in path {
        match cur.get(*seg) {
            Some(next) => cur = next,
            None => return String::new(),
        }
    }
    cur.as_str().unwrap_or_default().to_string()
}
