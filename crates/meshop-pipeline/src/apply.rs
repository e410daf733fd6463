//! Best-effort multi-component apply with aggregate outcome.
//!
//! Every component is attempted even if earlier ones failed; the caller gets
//! the full per-component detail plus one aggregate error flag.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info};

use meshop_core::errors::MeshopError;

use crate::generate::ComponentManifestMap;

/// Benign stderr prefixes produced by common apply tooling. Injected into
/// [`apply_all`] by default-minded callers; tests and embedders supply their
/// own list.
pub const DEFAULT_IGNORABLE_STDERR: &[&str] = &[
    "Warning: kubectl apply should be used on resource created by either kubectl create --save-config or kubectl apply",
];

/// Options passed through to the external applier.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Skip mutating calls
    pub dry_run: bool,
    /// Emit unfiltered diffs and extra logging
    pub verbose: bool,
    /// Duration the applier should wait for resources to become ready
    pub wait_timeout: Duration,
    /// Credentials path, passed through opaquely
    pub kubeconfig: Option<PathBuf>,
    /// Cluster context, passed through opaquely
    pub context: Option<String>,
}

/// Captured result of applying one component's manifest.
#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    pub stdout: String,
    pub stderr: String,
    pub error: Option<MeshopError>,
}

/// Applies one component manifest to the cluster. The low-level apply
/// mechanism is external; this seam only carries the options through.
pub trait ManifestApplier {
    fn apply(&self, component: &str, manifest: &str, opts: &InstallOptions) -> ApplyOutcome;
}

/// Aggregated result of applying every component.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub outcomes: BTreeMap<String, ApplyOutcome>,
    pub has_errors: bool,
}

/// Apply each component's manifest independently of the others' outcomes.
///
/// A component's stderr is ignorable if it is empty after trimming or starts
/// with an entry of `ignorable_stderr`; any non-ignorable stderr or non-nil
/// error marks the whole run as having errors. Never short-circuits.
pub fn apply_all(
    manifests: &ComponentManifestMap,
    applier: &dyn ManifestApplier,
    opts: &InstallOptions,
    ignorable_stderr: &[&str],
) -> ApplyReport {
    let mut report = ApplyReport::default();
    for (component, manifest) in manifests {
        let outcome = applier.apply(component, manifest, opts);
        match &outcome.error {
            Some(err) => {
                error!(component = %component, error = %err, "component apply returned an error");
                report.has_errors = true;
            }
            None => {
                info!(component = %component, "component applied");
            }
        }
        if !is_ignorable_stderr(&outcome.stderr, ignorable_stderr) {
            error!(component = %component, stderr = %outcome.stderr, "component apply produced errors");
            report.has_errors = true;
        }
        report.outcomes.insert(component.clone(), outcome);
    }
    report
}

/// Whether stderr text is benign: empty after trimming, or prefixed by an
/// allow-list entry.
pub fn is_ignorable_stderr(stderr: &str, allow_list: &[&str]) -> bool {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return true;
    }
    allow_list.iter().any(|prefix| trimmed.starts_with(prefix))
}
