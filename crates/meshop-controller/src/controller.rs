//! The control-plane reconciliation state machine.

use thiserror::Error;
use tracing::{error, info, warn};

use meshop_core::errors::MeshopError;

use crate::client::{ClusterClient, ClusterError};
use crate::resource::{ControlPlaneResource, ResourceKey};

/// Finalizer token marking this controller's ownership of cleanup for a
/// control-plane resource.
pub const FINALIZER: &str = "mesh-operator.install.mesh.io/finalizer";

/// Maximum number of conflict retries when persisting a finalizer change.
const FINALIZER_MAX_RETRIES: u32 = 10;

/// Outcome of one `reconcile` invocation. The external dispatcher is
/// responsible for requeue-on-error; this controller performs exactly one
/// attempt per invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Reconcile(#[from] MeshopError),
}

/// Per-resource reconciler collaborator. Internally it drives the manifest
/// pipeline; here it is only dispatched to.
pub trait ControlPlaneReconciler {
    /// Converge owned cluster resources toward the declared spec.
    fn reconcile(&self, resource: &ControlPlaneResource) -> Result<(), MeshopError>;

    /// Tear down owned cluster resources ahead of finalizer removal.
    fn delete(&self, resource: &ControlPlaneResource) -> Result<(), MeshopError>;
}

impl<T: ControlPlaneReconciler + ?Sized> ControlPlaneReconciler for &T {
    fn reconcile(&self, resource: &ControlPlaneResource) -> Result<(), MeshopError> {
        (**self).reconcile(resource)
    }

    fn delete(&self, resource: &ControlPlaneResource) -> Result<(), MeshopError> {
        (**self).delete(resource)
    }
}

/// Event-driven control loop for the control-plane resource.
///
/// Invoked by an external dispatcher that serializes invocations per resource
/// key; distinct resources may reconcile concurrently on separate
/// controllers. All cluster access is blocking read-modify-write against the
/// latest fetched revision, with bounded conflict retry as the only
/// conflict-resolution discipline.
pub struct Controller<C, R> {
    client: C,
    reconciler: R,
}

impl<C: ClusterClient, R: ControlPlaneReconciler> Controller<C, R> {
    pub fn new(client: C, reconciler: R) -> Self {
        Self { client, reconciler }
    }

    /// Run one reconciliation pass for the resource at `key`.
    ///
    /// A vanished resource is success. A deleting resource has the
    /// per-resource delete run best-effort, then the finalizer removed and
    /// persisted unconditionally: a failed owned-resource cleanup must never
    /// leave the resource stuck un-deletable. A live resource gets the
    /// finalizer ensured, then exactly one update dispatch.
    ///
    /// # Errors
    ///
    /// Returns fetch/update errors for the dispatcher to requeue, the delete
    /// error when deletion cleanup failed but the finalizer was persisted,
    /// or the reconcile error from the per-resource reconciler.
    pub fn reconcile(&self, key: &ResourceKey) -> Result<(), ControllerError> {
        let Some(res) = self.client.get(key)? else {
            info!(key = %key, "control-plane resource not found, nothing to reconcile");
            return Ok(());
        };

        if res.is_deleting() {
            if !res.has_finalizer(FINALIZER) {
                info!(key = %key, "control-plane resource already finalized");
                return Ok(());
            }
            info!(key = %key, "deleting control-plane resources");
            let delete_err = match self.reconciler.delete(&res) {
                Ok(()) => None,
                Err(err) => {
                    error!(key = %key, error = %err, "delete of owned resources failed");
                    Some(err)
                }
            };
            // Finalizer removal is unconditional on the delete outcome.
            self.persist_finalizer_change(key, res, |r| r.remove_finalizer(FINALIZER))?;
            return match delete_err {
                Some(err) => Err(err.into()),
                None => Ok(()),
            };
        }

        let res = if res.has_finalizer(FINALIZER) {
            res
        } else {
            info!(key = %key, finalizer = FINALIZER, "adding finalizer");
            match self.persist_finalizer_change(key, res, |r| r.add_finalizer(FINALIZER))? {
                Some(res) => res,
                None => {
                    info!(key = %key, "control-plane resource vanished while adding finalizer");
                    return Ok(());
                }
            }
        };

        info!(key = %key, "updating control-plane resources");
        self.reconciler.reconcile(&res).map_err(|err| {
            error!(key = %key, error = %err, "reconciliation failed");
            err.into()
        })
    }

    /// Apply a finalizer mutation and persist it, retrying on
    /// optimistic-concurrency conflicts against the latest fetched revision,
    /// bounded at [`FINALIZER_MAX_RETRIES`] attempts. Non-conflict update
    /// errors surface immediately; exhausting retries surfaces the last
    /// conflict. Returns the persisted resource, or `None` when the resource
    /// vanished mid-retry and nothing was persisted.
    fn persist_finalizer_change<F>(
        &self,
        key: &ResourceKey,
        mut res: ControlPlaneResource,
        mutate: F,
    ) -> Result<Option<ControlPlaneResource>, ClusterError>
    where
        F: Fn(&mut ControlPlaneResource),
    {
        mutate(&mut res);
        let mut result = self.client.update(&res);
        let mut attempts = 0;
        while result.as_ref().err().map(ClusterError::is_conflict) == Some(true)
            && attempts < FINALIZER_MAX_RETRIES
        {
            attempts += 1;
            warn!(key = %key, attempt = attempts, "conflict persisting finalizer change, retrying");
            match self.client.get(key)? {
                Some(latest) => {
                    res = latest;
                    mutate(&mut res);
                    result = self.client.update(&res);
                }
                None => {
                    // Vanished mid-retry: nothing left to persist.
                    return Ok(None);
                }
            }
        }
        result.map(|()| Some(res))
    }
}
