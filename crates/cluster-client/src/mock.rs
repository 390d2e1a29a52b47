//! Mock ClusterClient for unit testing
//!
//! This module provides an in-memory implementation of `ClusterClientTrait`
//! that can be used in unit tests without a running API server.
//!
//! The store mimics the API server behaviours the reconciler depends on:
//! - `resourceVersion` checks on update (stale writes fail with a conflict)
//! - deletion of an object with finalizers only sets `deletionTimestamp`
//! - removing the last finalizer from a deleting object removes it
//! - removing an AINIC garbage-collects DaemonSets that it owns

use crate::error::ClusterError;
use crate::models::{Lookup, ObjectKey};
use crate::cluster_trait::ClusterClientTrait;
use chrono::{SecondsFormat, Utc};
use crds::AINIC;
use k8s_openapi::api::apps::v1::{DaemonSet, DaemonSetStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Operations exposed by the mock, used for failure injection and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    GetAinic,
    CreateAinic,
    UpdateAinic,
    UpdateAinicStatus,
    DeleteAinic,
    GetDaemonSet,
    CreateDaemonSet,
    UpdateDaemonSet,
    DeleteDaemonSet,
}

/// Mock ClusterClient for testing
///
/// Objects live in memory. Every successful write is recorded so tests can
/// assert on how many mutations a reconcile pass performed.
#[derive(Clone, Default)]
pub struct MockClusterClient {
    ainics: Arc<Mutex<HashMap<ObjectKey, AINIC>>>,
    daemon_sets: Arc<Mutex<HashMap<ObjectKey, DaemonSet>>>,
    failures: Arc<Mutex<HashMap<MockOperation, String>>>,
    writes: Arc<Mutex<Vec<MockOperation>>>,
    next_version: Arc<Mutex<u64>>,
}

impl std::fmt::Debug for MockClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClusterClient")
            .field("ainics", &self.ainics.lock().unwrap().len())
            .field("daemon_sets", &self.daemon_sets.lock().unwrap().len())
            .finish_non_exhaustive()
    }
}

impl MockClusterClient {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an AINIC to the mock store (for test setup, not recorded as a write)
    pub fn add_ainic(&self, ainic: AINIC) -> AINIC {
        let key = ObjectKey::from_resource(&ainic).unwrap();
        let mut stored = ainic;
        self.stamp_new(&mut stored.metadata, &key);
        self.ainics.lock().unwrap().insert(key, stored.clone());
        stored
    }

    /// Current stored AINIC, if any
    pub fn stored_ainic(&self, key: &ObjectKey) -> Option<AINIC> {
        self.ainics.lock().unwrap().get(key).cloned()
    }

    /// Current stored DaemonSet, if any
    pub fn stored_daemon_set(&self, key: &ObjectKey) -> Option<DaemonSet> {
        self.daemon_sets.lock().unwrap().get(key).cloned()
    }

    /// Simulate the DaemonSet controller reporting scheduling progress
    pub fn set_daemon_set_counts(&self, key: &ObjectKey, desired: i32, ready: i32) {
        let version = self.bump_version();
        let mut daemon_sets = self.daemon_sets.lock().unwrap();
        let daemon_set = daemon_sets.get_mut(key).unwrap();
        daemon_set.status = Some(DaemonSetStatus {
            desired_number_scheduled: desired,
            number_ready: ready,
            current_number_scheduled: desired,
            number_misscheduled: 0,
            ..Default::default()
        });
        daemon_set.metadata.resource_version = Some(version);
    }

    /// Mutate a stored AINIC out of band, as another client would
    pub fn edit_ainic(&self, key: &ObjectKey, edit: impl FnOnce(&mut AINIC)) {
        let version = self.bump_version();
        let mut ainics = self.ainics.lock().unwrap();
        let ainic = ainics.get_mut(key).unwrap();
        edit(ainic);
        ainic.metadata.resource_version = Some(version);
    }

    /// Make the next call of `operation` fail with an API error
    pub fn fail_next(&self, operation: MockOperation, message: impl Into<String>) {
        self.failures.lock().unwrap().insert(operation, message.into());
    }

    /// All successful writes, in call order
    pub fn writes(&self) -> Vec<MockOperation> {
        self.writes.lock().unwrap().clone()
    }

    /// Number of successful writes of the given kind
    pub fn write_count(&self, operation: MockOperation) -> usize {
        self.writes.lock().unwrap().iter().filter(|op| **op == operation).count()
    }

    /// Forget recorded writes
    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    fn take_failure(&self, operation: MockOperation) -> Result<(), ClusterError> {
        match self.failures.lock().unwrap().remove(&operation) {
            Some(message) => Err(ClusterError::Api(message)),
            None => Ok(()),
        }
    }

    fn record(&self, operation: MockOperation) {
        self.writes.lock().unwrap().push(operation);
    }

    fn bump_version(&self) -> String {
        let mut version = self.next_version.lock().unwrap();
        *version += 1;
        version.to_string()
    }

    fn stamp_new(&self, meta: &mut ObjectMeta, key: &ObjectKey) {
        meta.namespace = Some(key.namespace.clone());
        meta.uid = Some(uuid::Uuid::new_v4().to_string());
        meta.resource_version = Some(self.bump_version());
        meta.generation = Some(1);
        meta.creation_timestamp = Some(now());
    }

    fn check_version(kind: &str, key: &ObjectKey, sent: &ObjectMeta, stored: &ObjectMeta) -> Result<(), ClusterError> {
        match &sent.resource_version {
            Some(version) if Some(version) != stored.resource_version.as_ref() => Err(ClusterError::Conflict(format!(
                "{kind} {key} has been modified; please apply your changes to the latest version"
            ))),
            _ => Ok(()),
        }
    }

    /// Garbage-collect DaemonSets whose owner is gone
    fn collect_owned(&self, owner_uid: Option<&str>) {
        let Some(owner_uid) = owner_uid else {
            return;
        };
        self.daemon_sets.lock().unwrap().retain(|_, daemon_set| {
            !daemon_set
                .metadata
                .owner_references
                .as_ref()
                .is_some_and(|refs| refs.iter().any(|r| r.uid == owner_uid))
        });
    }
}

fn now() -> Time {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    serde_json::from_value(serde_json::Value::String(timestamp)).unwrap()
}

fn not_found(kind: &str, key: &ObjectKey) -> ClusterError {
    ClusterError::Api(format!("{kind} {key} not found"))
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn get_ainic(&self, key: &ObjectKey) -> Result<Lookup<AINIC>, ClusterError> {
        self.take_failure(MockOperation::GetAinic)?;
        Ok(self.stored_ainic(key).into())
    }

    async fn create_ainic(&self, ainic: &AINIC) -> Result<AINIC, ClusterError> {
        self.take_failure(MockOperation::CreateAinic)?;
        let key = ObjectKey::from_resource(ainic)?;
        if self.ainics.lock().unwrap().contains_key(&key) {
            return Err(ClusterError::AlreadyExists(format!("AINIC {key}")));
        }
        let stored = self.add_ainic(ainic.clone());
        self.record(MockOperation::CreateAinic);
        Ok(stored)
    }

    async fn update_ainic(&self, ainic: &AINIC) -> Result<AINIC, ClusterError> {
        self.take_failure(MockOperation::UpdateAinic)?;
        let key = ObjectKey::from_resource(ainic)?;
        let version = self.bump_version();

        let (updated, removed_uid) = {
            let mut ainics = self.ainics.lock().unwrap();
            let stored = ainics.get(&key).ok_or_else(|| not_found("AINIC", &key))?;
            Self::check_version("AINIC", &key, &ainic.metadata, &stored.metadata)?;

            let mut updated = ainic.clone();
            updated.status = stored.status.clone();
            updated.metadata.uid = stored.metadata.uid.clone();
            updated.metadata.creation_timestamp = stored.metadata.creation_timestamp.clone();
            updated.metadata.deletion_timestamp = stored.metadata.deletion_timestamp.clone();
            updated.metadata.resource_version = Some(version);
            if updated.spec != stored.spec {
                updated.metadata.generation = stored.metadata.generation.map(|g| g + 1);
            } else {
                updated.metadata.generation = stored.metadata.generation;
            }

            let finalized = updated.metadata.deletion_timestamp.is_some()
                && updated.metadata.finalizers.as_ref().is_none_or(Vec::is_empty);
            if finalized {
                let uid = stored.metadata.uid.clone();
                ainics.remove(&key);
                (updated, uid)
            } else {
                ainics.insert(key, updated.clone());
                (updated, None)
            }
        };

        self.collect_owned(removed_uid.as_deref());
        self.record(MockOperation::UpdateAinic);
        Ok(updated)
    }

    async fn update_ainic_status(&self, ainic: &AINIC) -> Result<AINIC, ClusterError> {
        self.take_failure(MockOperation::UpdateAinicStatus)?;
        let key = ObjectKey::from_resource(ainic)?;
        let version = self.bump_version();

        let updated = {
            let mut ainics = self.ainics.lock().unwrap();
            let stored = ainics.get_mut(&key).ok_or_else(|| not_found("AINIC", &key))?;
            Self::check_version("AINIC", &key, &ainic.metadata, &stored.metadata)?;
            stored.status = ainic.status.clone();
            stored.metadata.resource_version = Some(version);
            stored.clone()
        };

        self.record(MockOperation::UpdateAinicStatus);
        Ok(updated)
    }

    async fn delete_ainic(&self, key: &ObjectKey) -> Result<(), ClusterError> {
        self.take_failure(MockOperation::DeleteAinic)?;
        let version = self.bump_version();

        let removed_uid = {
            let mut ainics = self.ainics.lock().unwrap();
            let Some(stored) = ainics.get_mut(key) else {
                return Ok(());
            };
            let has_finalizers = stored.metadata.finalizers.as_ref().is_some_and(|f| !f.is_empty());
            if has_finalizers {
                if stored.metadata.deletion_timestamp.is_none() {
                    stored.metadata.deletion_timestamp = Some(now());
                    stored.metadata.resource_version = Some(version);
                }
                None
            } else {
                ainics.remove(key).and_then(|removed| removed.metadata.uid)
            }
        };

        self.collect_owned(removed_uid.as_deref());
        self.record(MockOperation::DeleteAinic);
        Ok(())
    }

    async fn get_daemon_set(&self, key: &ObjectKey) -> Result<Lookup<DaemonSet>, ClusterError> {
        self.take_failure(MockOperation::GetDaemonSet)?;
        Ok(self.stored_daemon_set(key).into())
    }

    async fn create_daemon_set(&self, daemon_set: &DaemonSet) -> Result<DaemonSet, ClusterError> {
        self.take_failure(MockOperation::CreateDaemonSet)?;
        let key = ObjectKey::from_resource(daemon_set)?;

        let mut stored = daemon_set.clone();
        {
            let mut daemon_sets = self.daemon_sets.lock().unwrap();
            if daemon_sets.contains_key(&key) {
                return Err(ClusterError::AlreadyExists(format!("DaemonSet {key}")));
            }
            self.stamp_new(&mut stored.metadata, &key);
            stored.status = None;
            daemon_sets.insert(key, stored.clone());
        }

        self.record(MockOperation::CreateDaemonSet);
        Ok(stored)
    }

    async fn update_daemon_set(&self, daemon_set: &DaemonSet) -> Result<DaemonSet, ClusterError> {
        self.take_failure(MockOperation::UpdateDaemonSet)?;
        let key = ObjectKey::from_resource(daemon_set)?;
        let version = self.bump_version();

        let updated = {
            let mut daemon_sets = self.daemon_sets.lock().unwrap();
            let stored = daemon_sets.get(&key).ok_or_else(|| not_found("DaemonSet", &key))?;
            Self::check_version("DaemonSet", &key, &daemon_set.metadata, &stored.metadata)?;

            let mut updated = daemon_set.clone();
            updated.status = stored.status.clone();
            updated.metadata.uid = stored.metadata.uid.clone();
            updated.metadata.creation_timestamp = stored.metadata.creation_timestamp.clone();
            updated.metadata.resource_version = Some(version);
            updated.metadata.generation = if updated.spec != stored.spec {
                stored.metadata.generation.map(|g| g + 1)
            } else {
                stored.metadata.generation
            };
            daemon_sets.insert(key, updated.clone());
            updated
        };

        self.record(MockOperation::UpdateDaemonSet);
        Ok(updated)
    }

    async fn delete_daemon_set(&self, key: &ObjectKey) -> Result<(), ClusterError> {
        self.take_failure(MockOperation::DeleteDaemonSet)?;
        if self.daemon_sets.lock().unwrap().remove(key).is_some() {
            self.record(MockOperation::DeleteDaemonSet);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    fn ainic(name: &str, finalizers: &[&str]) -> AINIC {
        AINIC {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                finalizers: Some(finalizers.iter().map(|f| f.to_string()).collect()),
                ..Default::default()
            },
            spec: Default::default(),
            status: None,
        }
    }

    fn owned_daemon_set(name: &str, owner: &AINIC) -> DaemonSet {
        DaemonSet {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                owner_references: Some(vec![OwnerReference {
                    api_version: "network.amd.com/v1".to_string(),
                    kind: "AINIC".to_string(),
                    name: owner.metadata.name.clone().unwrap(),
                    uid: owner.metadata.uid.clone().unwrap(),
                    controller: Some(true),
                    ..Default::default()
                }]),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let client = MockClusterClient::new();
        let stored = client.add_ainic(ainic("nic", &[]));
        let key = ObjectKey::new("default", "nic");

        client.edit_ainic(&key, |a| a.spec.driver.version = "2.0.0".to_string());

        let result = client.update_ainic(&stored).await;
        assert!(matches!(result, Err(ClusterError::Conflict(_))));
        assert_eq!(client.write_count(MockOperation::UpdateAinic), 0);
    }

    #[tokio::test]
    async fn test_delete_with_finalizer_only_marks_deletion() {
        let client = MockClusterClient::new();
        client.add_ainic(ainic("nic", &["network.amd.com/finalizer"]));
        let key = ObjectKey::new("default", "nic");

        client.delete_ainic(&key).await.unwrap();

        let stored = client.stored_ainic(&key).unwrap();
        assert!(stored.metadata.deletion_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_removing_last_finalizer_collects_owned_daemon_sets() {
        let client = MockClusterClient::new();
        let owner = client.add_ainic(ainic("nic", &["network.amd.com/finalizer"]));
        let key = ObjectKey::new("default", "nic");
        let ds_key = ObjectKey::new("default", "nic-ainic-driver");
        client.create_daemon_set(&owned_daemon_set("nic-ainic-driver", &owner)).await.unwrap();
        client.create_daemon_set(&DaemonSet {
            metadata: ObjectMeta {
                name: Some("unrelated".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }).await.unwrap();

        client.delete_ainic(&key).await.unwrap();
        let mut deleting = client.stored_ainic(&key).unwrap();
        deleting.metadata.finalizers = Some(vec![]);
        client.update_ainic(&deleting).await.unwrap();

        assert!(client.stored_ainic(&key).is_none());
        assert!(client.stored_daemon_set(&ds_key).is_none());
        assert!(client.stored_daemon_set(&ObjectKey::new("default", "unrelated")).is_some());
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let client = MockClusterClient::new();
        client.fail_next(MockOperation::GetAinic, "connection reset");
        let key = ObjectKey::new("default", "nic");

        assert!(matches!(client.get_ainic(&key).await, Err(ClusterError::Api(_))));
        assert_eq!(client.get_ainic(&key).await.unwrap(), Lookup::Absent);
    }

    #[tokio::test]
    async fn test_status_update_keeps_spec() {
        let client = MockClusterClient::new();
        let mut stored = client.add_ainic(ainic("nic", &[]));
        stored.spec.driver.image = "ignored".to_string();
        stored.status = Some(crds::AINICStatus {
            nodes_total: 2,
            ..Default::default()
        });

        let updated = client.update_ainic_status(&stored).await.unwrap();

        assert_eq!(updated.spec.driver.image, "");
        assert_eq!(updated.status.unwrap().nodes_total, 2);
        assert_eq!(client.writes(), vec![MockOperation::UpdateAinicStatus]);
    }
}
