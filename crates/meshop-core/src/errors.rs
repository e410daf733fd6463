use thiserror::Error;

/// Result type alias using MeshopError
pub type Result<T> = std::result::Result<T, MeshopError>;

/// Error taxonomy for the operator core.
///
/// Syntax and validation errors are raised before any cluster mutation;
/// collaborator failures (merge, render, fetch, apply) are wrapped so the
/// pipeline can report them per stage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshopError {
    /// Override entry does not have exactly one `=` separator
    #[error("bad argument {entry}: expected format path=value")]
    MalformedOverride { entry: String },

    /// Resource pattern is not a 3-component `kind:namespace:name` indicator
    /// or does not compile to a regular expression
    #[error("bad resource pattern {pattern}: {reason}")]
    MalformedPattern { pattern: String, reason: String },

    /// Specification failed schema validation
    #[error("spec validation failed: {reason}")]
    Validation { reason: String },

    /// Base and overlay specs could not be merged
    #[error("spec merge failed: {reason}")]
    Merge { reason: String },

    /// The external renderer failed to produce component manifests
    #[error("manifest rendering failed: {reason}")]
    Render { reason: String },

    /// A remote install package could not be fetched or extracted
    #[error("install package fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// A per-component apply call failed
    #[error("apply failed for component {component}: {reason}")]
    Apply { component: String, reason: String },

    /// Per-resource reconciliation failed
    #[error("reconciliation failed: {reason}")]
    Reconcile { reason: String },

    /// Serialization error (YAML/JSON encoding or decoding)
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for MeshopError {
    fn from(err: serde_json::Error) -> Self {
        MeshopError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for MeshopError {
    fn from(err: serde_yaml::Error) -> Self {
        MeshopError::Serialization {
            message: err.to_string(),
        }
    }
}
