//! Meshop Core - Manifest object model and diff engine
//!
//! This crate provides the foundational data structures for the mesh operator:
//! - `MeshObject`: a single cluster-resource document with derived identity and
//!   cached serialized forms
//! - `ObjectSet`: an ordered collection of objects with identity indexes and
//!   deterministic apply ordering
//! - Diff engine: rename/select/ignore filtering and structural comparison
//!   between two renderings of a cluster state
//!
//! No I/O happens here; all cluster interaction lives behind trait seams in
//! the pipeline and controller crates.

pub mod diff;
pub mod errors;
pub mod logging;
pub mod object;

// Re-export commonly used types
pub use diff::{diff_manifests, diff_manifests_with_rename_select_ignore};
pub use errors::{MeshopError, Result};
pub use object::{identity_key, name_kind_key, MeshObject, ObjectSet};
