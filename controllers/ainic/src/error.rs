//! Controller-specific error types.
//!
//! Cluster access failures come from `cluster_client`; everything else that
//! can stop or fail a reconcile pass is listed here.

use cluster_client::ClusterError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the AINIC Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Reading or writing AINIC / DaemonSet objects failed
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// Kubernetes client setup error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Probe/metrics server failed
    #[error("Probe server failed: {0}")]
    Server(String),
}
