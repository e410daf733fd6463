//! Meshop Controller - control-plane reconciliation loop
//!
//! The event-driven control loop for the mesh control-plane resource: fetch,
//! finalizer state machine, and dispatch to the per-resource reconciler. The
//! dispatcher that enqueues keys and serializes per-key invocations is
//! external; every cluster call here is blocking and synchronous.

pub mod client;
pub mod controller;
pub mod resource;

// Re-export commonly used types
pub use client::{ClusterClient, ClusterError};
pub use controller::{Controller, ControllerError, ControlPlaneReconciler, FINALIZER};
pub use resource::{ControlPlaneResource, ResourceKey};
