//! Control-plane resource model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Namespaced name identifying one control-plane resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A named, namespaced control-plane declaration.
///
/// The spec document is opaque to the controller; only the finalizer list is
/// mutated here. The deletion timestamp is set by the cluster when deletion
/// is requested and its presence drives the deletion state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPlaneResource {
    pub key: ResourceKey,

    /// Revision used for optimistic-concurrency writes
    pub resource_version: u64,

    /// Present iff the resource is being deleted
    pub deletion_timestamp: Option<DateTime<Utc>>,

    /// Finalizer tokens blocking physical deletion
    pub finalizers: Vec<String>,

    /// The declared specification (opaque here)
    pub spec: Value,
}

impl ControlPlaneResource {
    pub fn new(key: ResourceKey, spec: Value) -> Self {
        Self {
            key,
            resource_version: 0,
            deletion_timestamp: None,
            finalizers: Vec::new(),
            spec,
        }
    }

    /// The resource is deleting iff its deletion marker is set.
    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self, token: &str) -> bool {
        self.finalizers.iter().any(|f| f == token)
    }

    /// Add a finalizer token. Adding an already-present token is a no-op.
    pub fn add_finalizer(&mut self, token: &str) {
        if !self.has_finalizer(token) {
            self.finalizers.push(token.to_string());
        }
    }

    /// Remove every instance of a finalizer token. Removing an absent token
    /// is a no-op.
    pub fn remove_finalizer(&mut self, token: &str) {
        self.finalizers.retain(|f| f != token);
    }
}
