//! Manifest generation: merge, validate, resolve, render.
//!
//! The merge/validate/fetch/render collaborators are injected as traits; they
//! report plain string reasons which this stage wraps into the pipeline error
//! taxonomy. Any stage failing aborts before any cluster mutation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_yaml::Value;
use tracing::warn;

use meshop_core::errors::{MeshopError, Result};

/// Spec field holding the install package location. A remote URL here is
/// resolved to a local path before rendering.
pub const INSTALL_PACKAGE_PATH_FIELD: &str = "installPackagePath";

/// Mapping from a logical component name to its rendered manifest text: the
/// contract between this pipeline and the external renderer.
pub type ComponentManifestMap = BTreeMap<String, String>;

/// Merges a base specification with an override tree.
pub trait SpecMerger {
    fn merge(&self, base: &str, overlay: &str) -> std::result::Result<String, String>;
}

/// Validates a specification document against the schema.
pub trait SpecValidator {
    fn validate(&self, spec: &str) -> std::result::Result<(), String>;
}

/// Renders a validated specification into per-component manifests.
pub trait ManifestRenderer {
    fn render(&self, spec: &Value) -> std::result::Result<ComponentManifestMap, String>;
}

/// Fetches and extracts a remote install package, returning the local
/// directory that replaces the remote reference in the spec.
pub trait PackageFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<PathBuf, String>;
}

/// The external collaborators of [`generate_manifests`].
pub struct RenderCollaborators<'a> {
    pub merger: &'a dyn SpecMerger,
    pub validator: &'a dyn SpecValidator,
    pub fetcher: &'a dyn PackageFetcher,
    pub renderer: &'a dyn ManifestRenderer,
}

/// Merge base and override into a final specification, validate it, resolve a
/// remote install package reference, and render the component manifests.
///
/// Validation failure aborts unless `strict` is false, in which case it is
/// downgraded to a warning.
///
/// # Errors
///
/// Returns `Merge`, `Validation`, `Fetch` or `Render` for the failing stage;
/// `Serialization` if the merged spec is not valid YAML.
pub fn generate_manifests(
    base_spec: &str,
    overlay: &Value,
    strict: bool,
    deps: &RenderCollaborators<'_>,
) -> Result<ComponentManifestMap> {
    let overlay_yaml = serde_yaml::to_string(overlay)?;
    let merged = deps
        .merger
        .merge(base_spec, &overlay_yaml)
        .map_err(|reason| MeshopError::Merge { reason })?;

    if let Err(err) = deps.validator.validate(&merged) {
        if strict {
            return Err(MeshopError::Validation { reason: err });
        }
        warn!(error = %err, "merged spec failed validation, continuing");
    }

    let mut spec: Value = serde_yaml::from_str(&merged)?;
    resolve_install_package(&mut spec, deps.fetcher)?;

    deps.renderer
        .render(&spec)
        .map_err(|reason| MeshopError::Render { reason })
}

/// Rewrite a remote `installPackagePath` to the locally fetched directory.
/// Local paths pass through untouched.
fn resolve_install_package(spec: &mut Value, fetcher: &dyn PackageFetcher) -> Result<()> {
    let Some(mapping) = spec.as_mapping_mut() else {
        return Ok(());
    };
    let key = Value::from(INSTALL_PACKAGE_PATH_FIELD);
    let Some(url) = mapping.get(&key).and_then(Value::as_str) else {
        return Ok(());
    };
    if !is_http_url(url) {
        return Ok(());
    }
    let local = fetcher
        .fetch(url)
        .map_err(|reason| MeshopError::Fetch {
            url: url.to_string(),
            reason,
        })?;
    mapping.insert(key, Value::from(local.display().to_string()));
    Ok(())
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OverlayWins;
    impl SpecMerger for OverlayWins {
        fn merge(&self, base: &str, overlay: &str) -> std::result::Result<String, String> {
            // Shallow concatenation is enough for tests: the test specs do
            // not overlap, and an empty overlay leaves the base untouched.
            let overlay = overlay.trim();
            if overlay.is_empty() || overlay == "{}" {
                return Ok(base.to_string());
            }
            Ok(format!("{}\n{}", base, overlay))
        }
    }

    struct AcceptAll;
    impl SpecValidator for AcceptAll {
        fn validate(&self, _spec: &str) -> std::result::Result<(), String> {
            Ok(())
        }
    }

    struct RejectAll;
    impl SpecValidator for RejectAll {
        fn validate(&self, _spec: &str) -> std::result::Result<(), String> {
            Err("unknown field".to_string())
        }
    }

    struct NoFetch;
    impl PackageFetcher for NoFetch {
        fn fetch(&self, url: &str) -> std::result::Result<PathBuf, String> {
            Err(format!("unexpected fetch of {}", url))
        }
    }

    struct FixedFetch(&'static str);
    impl PackageFetcher for FixedFetch {
        fn fetch(&self, _url: &str) -> std::result::Result<PathBuf, String> {
            Ok(PathBuf::from(self.0))
        }
    }

    struct EchoRenderer;
    impl ManifestRenderer for EchoRenderer {
        fn render(&self, spec: &Value) -> std::result::Result<ComponentManifestMap, String> {
            let mut map = ComponentManifestMap::new();
            map.insert(
                "echo".to_string(),
                serde_yaml::to_string(spec).map_err(|e| e.to_string())?,
            );
            Ok(map)
        }
    }

    fn collaborators<'a>(
        validator: &'a dyn SpecValidator,
        fetcher: &'a dyn PackageFetcher,
        merger: &'a dyn SpecMerger,
        renderer: &'a dyn ManifestRenderer,
    ) -> RenderCollaborators<'a> {
        RenderCollaborators {
            merger,
            validator,
            fetcher,
            renderer,
        }
    }

    #[test]
    fn test_generate_renders_merged_spec() {
        let deps = collaborators(&AcceptAll, &NoFetch, &OverlayWins, &EchoRenderer);
        let overlay: Value = serde_yaml::from_str("pilot:\n  enabled: true\n").unwrap();
        let manifests = generate_manifests("profile: default\n", &overlay, true, &deps).unwrap();
        assert_eq!(manifests.len(), 1);
        assert!(manifests["echo"].contains("profile: default"));
        assert!(manifests["echo"].contains("enabled: true"));
    }

    #[test]
    fn test_strict_validation_aborts_before_render() {
        let deps = collaborators(&RejectAll, &NoFetch, &OverlayWins, &EchoRenderer);
        let overlay = Value::Mapping(Default::default());
        let err = generate_manifests("profile: default\n", &overlay, true, &deps).unwrap_err();
        assert!(matches!(err, MeshopError::Validation { .. }));
    }

    #[test]
    fn test_lenient_validation_continues_to_render() {
        let deps = collaborators(&RejectAll, &NoFetch, &OverlayWins, &EchoRenderer);
        let overlay = Value::Mapping(Default::default());
        let manifests =
            generate_manifests("profile: default\n", &overlay, false, &deps).unwrap();
        assert_eq!(manifests.len(), 1);
    }

    #[test]
    fn test_remote_install_package_is_rewritten() {
        let fetcher = FixedFetch("/tmp/cache/mesh-1.3.0/charts");
        let deps = collaborators(&AcceptAll, &fetcher, &OverlayWins, &EchoRenderer);
        let overlay = Value::Mapping(Default::default());
        let manifests = generate_manifests(
            "installPackagePath: https://example.com/mesh-1.3.0.tar.gz\n",
            &overlay,
            true,
            &deps,
        )
        .unwrap();
        assert!(manifests["echo"].contains("/tmp/cache/mesh-1.3.0/charts"));
        assert!(!manifests["echo"].contains("https://example.com"));
    }

    #[test]
    fn test_local_install_package_passes_through() {
        let deps = collaborators(&AcceptAll, &NoFetch, &OverlayWins, &EchoRenderer);
        let overlay = Value::Mapping(Default::default());
        let manifests = generate_manifests(
            "installPackagePath: /opt/mesh/charts\n",
            &overlay,
            true,
            &deps,
        )
        .unwrap();
        assert!(manifests["echo"].contains("/opt/mesh/charts"));
    }

    #[test]
    fn test_fetch_failure_aborts() {
        let deps = collaborators(&AcceptAll, &NoFetch, &OverlayWins, &EchoRenderer);
        let overlay = Value::Mapping(Default::default());
        let err = generate_manifests(
            "installPackagePath: https://example.com/mesh.tar.gz\n",
            &overlay,
            true,
            &deps,
        )
        .unwrap_err();
        assert!(matches!(err, MeshopError::Fetch { .. }));
    }
}
