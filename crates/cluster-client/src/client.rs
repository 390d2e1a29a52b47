//! Kubernetes-backed cluster accessor

use crate::error::ClusterError;
use crate::models::{Lookup, ObjectKey};
use crate::cluster_trait::ClusterClientTrait;
use crds::AINIC;
use k8s_openapi::api::apps::v1::DaemonSet;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use serde_json::json;
use tracing::debug;

/// Cluster accessor that talks to the Kubernetes API server.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    /// Wraps an existing Kubernetes client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn ainics(&self, namespace: &str) -> Api<AINIC> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn daemon_sets(&self, namespace: &str) -> Api<DaemonSet> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Maps 409 responses onto the typed variants callers branch on.
fn classify(kind: &str, key: &ObjectKey, err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
            ClusterError::AlreadyExists(format!("{} {}", kind, key))
        }
        kube::Error::Api(ae) if ae.code == 409 => ClusterError::Conflict(format!("{} {}: {}", kind, key, ae.message)),
        other => ClusterError::Kube(other),
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn get_ainic(&self, key: &ObjectKey) -> Result<Lookup<AINIC>, ClusterError> {
        Ok(self.ainics(&key.namespace).get_opt(&key.name).await?.into())
    }

    async fn create_ainic(&self, ainic: &AINIC) -> Result<AINIC, ClusterError> {
        let key = ObjectKey::from_resource(ainic)?;
        self.ainics(&key.namespace)
            .create(&PostParams::default(), ainic)
            .await
            .map_err(|e| classify("AINIC", &key, e))
    }

    async fn update_ainic(&self, ainic: &AINIC) -> Result<AINIC, ClusterError> {
        let key = ObjectKey::from_resource(ainic)?;
        debug!("Replacing AINIC {}", key);
        // replace sends metadata.resourceVersion, so a stale object is rejected with 409
        self.ainics(&key.namespace)
            .replace(&key.name, &PostParams::default(), ainic)
            .await
            .map_err(|e| classify("AINIC", &key, e))
    }

    async fn update_ainic_status(&self, ainic: &AINIC) -> Result<AINIC, ClusterError> {
        let key = ObjectKey::from_resource(ainic)?;
        let mut patch = json!({ "status": ainic.status });
        if let Some(resource_version) = &ainic.metadata.resource_version {
            patch["metadata"] = json!({ "resourceVersion": resource_version });
        }
        debug!("Patching AINIC {} status", key);
        self.ainics(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify("AINIC", &key, e))
    }

    async fn delete_ainic(&self, key: &ObjectKey) -> Result<(), ClusterError> {
        let api = self.ainics(&key.namespace);
        if api.get_opt(&key.name).await?.is_none() {
            return Ok(());
        }
        api.delete(&key.name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn get_daemon_set(&self, key: &ObjectKey) -> Result<Lookup<DaemonSet>, ClusterError> {
        Ok(self.daemon_sets(&key.namespace).get_opt(&key.name).await?.into())
    }

    async fn create_daemon_set(&self, daemon_set: &DaemonSet) -> Result<DaemonSet, ClusterError> {
        let key = ObjectKey::from_resource(daemon_set)?;
        debug!("Creating DaemonSet {}", key);
        self.daemon_sets(&key.namespace)
            .create(&PostParams::default(), daemon_set)
            .await
            .map_err(|e| classify("DaemonSet", &key, e))
    }

    async fn update_daemon_set(&self, daemon_set: &DaemonSet) -> Result<DaemonSet, ClusterError> {
        let key = ObjectKey::from_resource(daemon_set)?;
        debug!("Replacing DaemonSet {}", key);
        self.daemon_sets(&key.namespace)
            .replace(&key.name, &PostParams::default(), daemon_set)
            .await
            .map_err(|e| classify("DaemonSet", &key, e))
    }

    async fn delete_daemon_set(&self, key: &ObjectKey) -> Result<(), ClusterError> {
        let api = self.daemon_sets(&key.namespace);
        if api.get_opt(&key.name).await?.is_none() {
            return Ok(());
        }
        api.delete(&key.name, &DeleteParams::default()).await?;
        Ok(())
    }
}
