//! End-to-end pipeline tests: override list through rendering to apply
//! aggregation, with every external collaborator faked.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_yaml::Value;

use meshop_core::errors::MeshopError;
use meshop_pipeline::apply::{apply_all, ApplyOutcome, InstallOptions, ManifestApplier};
use meshop_pipeline::generate::{
    generate_manifests, ComponentManifestMap, ManifestRenderer, PackageFetcher,
    RenderCollaborators, SpecMerger, SpecValidator,
};
use meshop_pipeline::overlay::build_override_tree;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Merger that deep-merges overlay mappings over the base.
struct DeepMerger;

impl SpecMerger for DeepMerger {
    fn merge(&self, base: &str, overlay: &str) -> Result<String, String> {
        let mut base: Value = serde_yaml::from_str(base).map_err(|e| e.to_string())?;
        let overlay: Value = serde_yaml::from_str(overlay).map_err(|e| e.to_string())?;
        merge_into(&mut base, &overlay);
        serde_yaml::to_string(&base).map_err(|e| e.to_string())
    }
}

fn merge_into(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (k, v) in overlay {
                match base.get_mut(k) {
                    Some(existing) => merge_into(existing, v),
                    None => {
                        base.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Validator that rejects specs containing a marker key.
struct MarkerValidator;

impl SpecValidator for MarkerValidator {
    fn validate(&self, spec: &str) -> Result<(), String> {
        if spec.contains("forbiddenField") {
            Err("forbiddenField is not a spec field".to_string())
        } else {
            Ok(())
        }
    }
}

struct NoFetch;

impl PackageFetcher for NoFetch {
    fn fetch(&self, url: &str) -> Result<PathBuf, String> {
        Err(format!("unexpected fetch of {}", url))
    }
}

/// Renderer producing one manifest per component listed under `components`.
struct ComponentRenderer;

impl ManifestRenderer for ComponentRenderer {
    fn render(&self, spec: &Value) -> Result<ComponentManifestMap, String> {
        let namespace = spec
            .get("defaultNamespace")
            .and_then(Value::as_str)
            .unwrap_or("default");
        let mut out = ComponentManifestMap::new();
        if let Some(components) = spec.get("components").and_then(Value::as_sequence) {
            for c in components {
                let name = c.as_str().ok_or("component names must be strings")?;
                out.insert(
                    name.to_string(),
                    format!(
                        "kind: Deployment\nmetadata:\n  name: {}\n  namespace: {}\n",
                        name, namespace
                    ),
                );
            }
        }
        Ok(out)
    }
}

struct RecordingApplier {
    fail: Option<&'static str>,
    applied: RefCell<Vec<(String, InstallOptions)>>,
}

impl ManifestApplier for RecordingApplier {
    fn apply(&self, component: &str, _manifest: &str, opts: &InstallOptions) -> ApplyOutcome {
        self.applied
            .borrow_mut()
            .push((component.to_string(), opts.clone()));
        if self.fail == Some(component) {
            ApplyOutcome {
                stdout: String::new(),
                stderr: format!("{} apply failed", component),
                error: Some(MeshopError::Apply {
                    component: component.to_string(),
                    reason: "connection refused".to_string(),
                }),
            }
        } else {
            ApplyOutcome {
                stdout: format!("deployment.apps/{} configured", component),
                stderr: String::new(),
                error: None,
            }
        }
    }
}

fn collaborators<'a>(
    merger: &'a DeepMerger,
    validator: &'a MarkerValidator,
    fetcher: &'a NoFetch,
    renderer: &'a ComponentRenderer,
) -> RenderCollaborators<'a> {
    RenderCollaborators {
        merger,
        validator,
        fetcher,
        renderer,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_overrides_flow_through_to_rendered_manifests() {
    let overlay = build_override_tree(
        &["pilot.resources.cpu=200m".to_string()],
        true,
        &MarkerValidator,
    )
    .unwrap();

    let merger = DeepMerger;
    let deps = collaborators(&merger, &MarkerValidator, &NoFetch, &ComponentRenderer);
    let manifests = generate_manifests(
        "components:\n- pilot\n- telemetry\n",
        &overlay,
        true,
        &deps,
    )
    .unwrap();

    // Overlay's seeded default namespace reaches the rendered output.
    assert_eq!(manifests.len(), 2);
    assert!(manifests["pilot"].contains("namespace: istio-system"));
}

#[test]
fn test_validation_failure_stops_before_apply() {
    let merger = DeepMerger;
    let deps = collaborators(&merger, &MarkerValidator, &NoFetch, &ComponentRenderer);
    let overlay = Value::Mapping(Default::default());
    let err = generate_manifests("forbiddenField: true\n", &overlay, true, &deps).unwrap_err();
    assert!(matches!(err, MeshopError::Validation { .. }));
}

#[test]
fn test_apply_aggregates_partial_failure_with_detail() {
    let mut manifests = BTreeMap::new();
    for c in ["citadel", "pilot", "telemetry"] {
        manifests.insert(c.to_string(), format!("kind: Deployment\nmetadata:\n  name: {}\n", c));
    }
    let applier = RecordingApplier {
        fail: Some("pilot"),
        applied: RefCell::new(Vec::new()),
    };
    let opts = InstallOptions {
        dry_run: true,
        wait_timeout: std::time::Duration::from_secs(300),
        ..Default::default()
    };
    let report = apply_all(&manifests, &applier, &opts, &[]);

    // All three components visited, options passed through untouched.
    let applied = applier.applied.borrow();
    assert_eq!(applied.len(), 3);
    assert!(applied.iter().all(|(_, o)| o.dry_run));

    assert!(report.has_errors);
    assert_eq!(
        report.outcomes["pilot"].stderr,
        "pilot apply failed"
    );
    assert!(report.outcomes["citadel"].error.is_none());
    assert!(report.outcomes["telemetry"].error.is_none());
}
