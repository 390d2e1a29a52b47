//! Cluster accessor errors

use thiserror::Error;

/// Errors that can occur when reading or writing cluster objects
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Kubernetes API or transport error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Write raced against a newer version of the object
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Create targeted an object that already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The API rejected the request
    #[error("API error: {0}")]
    Api(String),

    /// Object is malformed (e.g. missing name)
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
