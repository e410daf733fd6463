//! Ordered collections of manifest objects.
//!
//! An [`ObjectSet`] is parsed from a multi-document manifest text and provides
//! identity-keyed index views plus a deterministic apply ordering.

use std::collections::BTreeMap;

use tracing::warn;

use crate::errors::Result;
use crate::object::MeshObject;

/// Separator line between documents in a multi-document manifest.
const DOCUMENT_SEPARATOR: &str = "---";

/// An ordered sequence of manifest objects, so that we can filter and
/// sequence them.
#[derive(Debug, Clone, Default)]
pub struct ObjectSet {
    objects: Vec<MeshObject>,
}

impl ObjectSet {
    /// Build a set from already-constructed objects, preserving their order.
    pub fn from_objects(objects: Vec<MeshObject>) -> Self {
        Self { objects }
    }

    /// Parse a multi-document manifest text.
    ///
    /// Documents are split on lines containing exactly `---`; `#`-prefixed
    /// lines are stripped before parsing. Chunks that are blank after
    /// stripping are silently dropped; chunks that fail to parse are skipped
    /// with a logged warning. The batch is never aborted.
    pub fn parse(manifest: &str) -> Self {
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        for line in manifest.lines() {
            if line == DOCUMENT_SEPARATOR {
                chunks.push(std::mem::take(&mut current));
            } else {
                current.push_str(line);
                current.push('\n');
            }
        }
        chunks.push(current);

        let mut objects = Vec::new();
        for chunk in chunks {
            let cleaned = strip_comment_lines(&chunk);
            if cleaned.is_empty() {
                continue;
            }
            match MeshObject::parse_yaml(&cleaned) {
                Ok(obj) => objects.push(obj),
                Err(err) => {
                    warn!(error = %err, "skipping manifest document that failed to parse");
                }
            }
        }
        Self { objects }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MeshObject> {
        self.objects.iter()
    }

    /// Identity-keyed index (`kind:namespace:name`).
    ///
    /// Invalid objects are dropped; key collisions overwrite, last write wins.
    pub fn to_identity_map(&self) -> BTreeMap<String, MeshObject> {
        let mut map = BTreeMap::new();
        for obj in &self.objects {
            if obj.valid() {
                map.insert(obj.identity_key(), obj.clone());
            }
        }
        map
    }

    /// Name/kind-keyed index (`kind:name`), same collision and validity
    /// behavior as [`ObjectSet::to_identity_map`].
    pub fn to_name_kind_map(&self) -> BTreeMap<String, MeshObject> {
        let mut map = BTreeMap::new();
        for obj in &self.objects {
            if obj.valid() {
                map.insert(obj.name_kind_key(), obj.clone());
            }
        }
        map
    }

    /// Order objects by (score, group, kind, name) for a deterministic apply
    /// sequence. The priority score is injected so the ordering scheme stays
    /// a caller decision.
    pub fn sort_by_score<F>(&mut self, score: F)
    where
        F: Fn(&MeshObject) -> i32,
    {
        self.objects.sort_by(|a, b| {
            (score(a), &a.group, &a.kind, &a.name).cmp(&(score(b), &b.group, &b.kind, &b.name))
        });
    }

    /// Render the set back to a multi-document YAML manifest.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if any object cannot be rendered.
    pub fn yaml_manifest(&mut self) -> Result<String> {
        let mut out = String::new();
        for obj in &mut self.objects {
            let yaml = obj.to_yaml()?;
            out.push_str(&yaml);
            if !yaml.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(DOCUMENT_SEPARATOR);
            out.push('\n');
        }
        Ok(out)
    }

    /// Render the set as newline-separated canonical JSON documents.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if any object cannot be rendered.
    pub fn json_manifest(&mut self) -> Result<String> {
        let mut docs = Vec::with_capacity(self.objects.len());
        for obj in &mut self.objects {
            docs.push(obj.to_json()?);
        }
        Ok(docs.join("\n\n"))
    }
}

/// Drop `#`-prefixed lines and surrounding whitespace. Template engines
/// sometimes emit documents containing only a "disabled" comment.
fn strip_comment_lines(chunk: &str) -> String {
    let kept: Vec<&str> = chunk
        .lines()
        .filter(|line| !line.starts_with('#'))
        .collect();
    kept.join("\n").trim().to_string()
}
