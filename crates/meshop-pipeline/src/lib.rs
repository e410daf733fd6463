//! Meshop Pipeline - from override list to applied manifests
//!
//! Connects override application, spec validation, rendering dispatch,
//! ordered apply and result aggregation. The template engine, schema
//! validator, package fetcher and cluster applier are external collaborators
//! behind trait seams; no stage here mutates the cluster before every earlier
//! stage has succeeded.

pub mod apply;
pub mod generate;
pub mod overlay;

// Re-export commonly used types
pub use apply::{
    apply_all, ApplyOutcome, ApplyReport, InstallOptions, ManifestApplier,
    DEFAULT_IGNORABLE_STDERR,
};
pub use generate::{
    generate_manifests, ComponentManifestMap, ManifestRenderer, PackageFetcher,
    RenderCollaborators, SpecMerger, SpecValidator,
};
pub use overlay::build_override_tree;
