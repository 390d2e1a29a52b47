//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::reconciler::Reconciler;
use crate::workload::WorkloadSettings;
use cluster_client::{MockClusterClient, ObjectKey};
use crds::{AINIC, AINICSpec, DriverSpec};
use k8s_openapi::api::apps::v1::{DaemonSet, DaemonSetStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use std::sync::Arc;
use std::time::Duration;

/// Requeue interval used by test reconcilers
pub const TEST_REQUEUE: Duration = Duration::from_secs(300);

/// Helper to create a test AINIC CRD without status or finalizers
pub fn create_test_ainic(name: &str, namespace: &str) -> AINIC {
    AINIC {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: AINICSpec {
            driver: DriverSpec {
                image: "amd/ainic-driver:1.0.0".to_string(),
                version: "1.0.0".to_string(),
                ..Default::default()
            },
            ..Default::default()
        },
        status: None,
    }
}

/// Helper to create a DaemonSet reporting the given counters
pub fn create_test_daemon_set(desired: i32, ready: i32) -> DaemonSet {
    DaemonSet {
        status: Some(DaemonSetStatus {
            desired_number_scheduled: desired,
            number_ready: ready,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Helper to create a reconciler backed by the mock cluster
pub fn create_test_reconciler(client: &MockClusterClient) -> Reconciler {
    Reconciler::new(Arc::new(client.clone()), WorkloadSettings::default(), TEST_REQUEUE)
}

/// Key of the driver DaemonSet for an AINIC in `default`
pub fn driver_key(ainic_name: &str) -> ObjectKey {
    ObjectKey::new("default", format!("{}-ainic-driver", ainic_name))
}

/// A fixed deletion timestamp
pub fn test_time() -> Time {
    serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).unwrap()
}
