//! ClusterClient trait for mocking
//!
//! This trait abstracts cluster access so the reconciler can run against the
//! real API server or an in-memory store in unit tests.

use crate::error::ClusterError;
use crate::models::{Lookup, ObjectKey};
use crds::AINIC;
use k8s_openapi::api::apps::v1::DaemonSet;

/// Read/write access to AINIC objects and their driver DaemonSets.
///
/// Updates carry the `resourceVersion` of the object they were derived from
/// and fail with a conflict if the stored object has moved on.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    // AINIC Operations
    async fn get_ainic(&self, key: &ObjectKey) -> Result<Lookup<AINIC>, ClusterError>;
    async fn create_ainic(&self, ainic: &AINIC) -> Result<AINIC, ClusterError>;
    /// Replaces metadata and spec (not status).
    async fn update_ainic(&self, ainic: &AINIC) -> Result<AINIC, ClusterError>;
    /// Writes the status subresource only.
    async fn update_ainic_status(&self, ainic: &AINIC) -> Result<AINIC, ClusterError>;
    /// Requests deletion; a missing object is not an error.
    async fn delete_ainic(&self, key: &ObjectKey) -> Result<(), ClusterError>;

    // DaemonSet Operations
    async fn get_daemon_set(&self, key: &ObjectKey) -> Result<Lookup<DaemonSet>, ClusterError>;
    async fn create_daemon_set(&self, daemon_set: &DaemonSet) -> Result<DaemonSet, ClusterError>;
    async fn update_daemon_set(&self, daemon_set: &DaemonSet) -> Result<DaemonSet, ClusterError>;
    /// Requests deletion; a missing object is not an error.
    async fn delete_daemon_set(&self, key: &ObjectKey) -> Result<(), ClusterError>;
}
