//! Cluster client seam.

use thiserror::Error;

use crate::resource::{ControlPlaneResource, ResourceKey};

/// Errors surfaced by the cluster client.
///
/// `Conflict` identifies an optimistic-concurrency failure on update and is
/// the only variant retried by the controller; everything else is returned to
/// the caller for requeue.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// The write lost an optimistic-concurrency race
    #[error("conflict updating {key}: {reason}")]
    Conflict { key: String, reason: String },

    /// Any other cluster API failure
    #[error("cluster API error for {key}: {reason}")]
    Api { key: String, reason: String },
}

impl ClusterError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClusterError::Conflict { .. })
    }
}

/// Blocking, synchronous access to control-plane resources in the cluster.
///
/// `get` returns `Ok(None)` when the resource does not exist: a vanished
/// resource is a legitimate state, not an error. `update` writes the given
/// revision and must fail with `Conflict` when the revision is stale.
pub trait ClusterClient {
    fn get(&self, key: &ResourceKey) -> Result<Option<ControlPlaneResource>, ClusterError>;
    fn update(&self, resource: &ControlPlaneResource) -> Result<(), ClusterError>;
}

impl<T: ClusterClient + ?Sized> ClusterClient for &T {
    fn get(&self, key: &ResourceKey) -> Result<Option<ControlPlaneResource>, ClusterError> {
        (**self).get(key)
    }

    fn update(&self, resource: &ControlPlaneResource) -> Result<(), ClusterError> {
        (**self).update(resource)
    }
}
