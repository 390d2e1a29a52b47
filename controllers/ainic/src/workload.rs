//! Driver DaemonSet construction and change detection.
//!
//! `build_daemon_set` is a pure function of the AINIC and the workload
//! settings. `needs_update` decides whether a stored DaemonSet has drifted
//! from what the builder would produce.

use crate::error::ControllerError;
use cluster_client::{ClusterError, ObjectKey};
use crds::AINIC;
use k8s_openapi::api::apps::v1::{DaemonSet, DaemonSetSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, HostPathVolumeSource, ObjectFieldSelector, PodSpec, PodTemplateSpec,
    SecurityContext, Toleration, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::Resource;
use serde_json::Value;
use std::collections::BTreeMap;

/// Default service account for driver pods
pub const DEFAULT_SERVICE_ACCOUNT: &str = "ainic-driver";

const DRIVER_CONTAINER: &str = "ainic-driver";

/// Host paths exposed to the driver: (volume name, host path, mount path, read-only)
const HOST_MOUNTS: [(&str, &str, &str, bool); 3] = [
    ("host-sys", "/sys", "/host/sys", false),
    ("host-dev", "/dev", "/host/dev", false),
    ("host-proc", "/proc", "/host/proc", true),
];

/// Settings for the driver workload that do not come from the AINIC object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSettings {
    pub service_account: String,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            service_account: DEFAULT_SERVICE_ACCOUNT.to_string(),
        }
    }
}

/// Name of the DaemonSet that runs the driver for an AINIC
pub fn driver_name(ainic_name: &str) -> String {
    format!("{}-ainic-driver", ainic_name)
}

/// Builds the desired driver DaemonSet for an AINIC.
///
/// The result carries a controller owner reference when the AINIC has a uid,
/// so the garbage collector removes it together with the AINIC.
pub fn build_daemon_set(ainic: &AINIC, settings: &WorkloadSettings) -> Result<DaemonSet, ControllerError> {
    let owner = ObjectKey::from_resource(ainic)?;
    let name = driver_name(&owner.name);
    let labels = BTreeMap::from([("app".to_string(), name.clone())]);

    let mut env = vec![EnvVar {
        name: "NODE_NAME".to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: "spec.nodeName".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }];
    env.extend(ainic.spec.driver.env.iter().map(|var| EnvVar {
        name: var.name.clone(),
        value: Some(var.value.clone()),
        ..Default::default()
    }));

    let container = Container {
        name: DRIVER_CONTAINER.to_string(),
        image: Some(ainic.spec.driver.image.clone()),
        args: (!ainic.spec.driver.args.is_empty()).then(|| ainic.spec.driver.args.clone()),
        env: Some(env),
        security_context: Some(SecurityContext {
            privileged: Some(true),
            ..Default::default()
        }),
        volume_mounts: Some(
            HOST_MOUNTS
                .iter()
                .map(|(volume, _, mount_path, read_only)| VolumeMount {
                    name: volume.to_string(),
                    mount_path: mount_path.to_string(),
                    read_only: read_only.then_some(true),
                    ..Default::default()
                })
                .collect(),
        ),
        ..Default::default()
    };

    let pod_spec = PodSpec {
        service_account_name: Some(settings.service_account.clone()),
        containers: vec![container],
        volumes: Some(
            HOST_MOUNTS
                .iter()
                .map(|(volume, host_path, _, _)| Volume {
                    name: volume.to_string(),
                    host_path: Some(HostPathVolumeSource {
                        path: host_path.to_string(),
                        type_: None,
                    }),
                    ..Default::default()
                })
                .collect(),
        ),
        tolerations: Some(vec![Toleration {
            operator: Some("Exists".to_string()),
            ..Default::default()
        }]),
        host_network: Some(true),
        host_pid: Some(true),
        // empty selector matches every node
        node_selector: (!ainic.spec.node_selector.is_empty()).then(|| ainic.spec.node_selector.clone()),
        ..Default::default()
    };

    Ok(DaemonSet {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(owner.namespace),
            labels: Some(labels.clone()),
            owner_references: ainic.controller_owner_ref(&()).map(|owner_ref| vec![owner_ref]),
            ..Default::default()
        },
        spec: Some(DaemonSetSpec {
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(pod_spec),
            },
            ..Default::default()
        }),
        status: None,
    })
}

/// Whether the stored DaemonSet differs from the desired one in any field
/// the controller owns (selector, pod template, controller owner reference).
pub fn needs_update(existing: &DaemonSet, desired: &DaemonSet) -> Result<bool, ControllerError> {
    let (Some(existing_spec), Some(desired_spec)) = (&existing.spec, &desired.spec) else {
        return Ok(existing.spec.is_none() && desired.spec.is_some());
    };

    let selector_matches = is_subset(
        &serde_json::to_value(&desired_spec.selector).map_err(ClusterError::from)?,
        &serde_json::to_value(&existing_spec.selector).map_err(ClusterError::from)?,
    );
    let template_matches = is_subset(
        &serde_json::to_value(&desired_spec.template).map_err(ClusterError::from)?,
        &serde_json::to_value(&existing_spec.template).map_err(ClusterError::from)?,
    );
    let owner_matches = match controller_ref(desired) {
        Some(wanted) => controller_ref(existing).is_some_and(|current| current.uid == wanted.uid),
        None => true,
    };
    let optionals_match = match (&existing_spec.template.spec, &desired_spec.template.spec) {
        (Some(current), Some(wanted)) => optional_fields_match(current, wanted),
        (current, wanted) => current.is_none() == wanted.is_none(),
    };

    Ok(!(selector_matches && template_matches && owner_matches && optionals_match))
}

/// Exact comparison of the builder-owned fields the subset check cannot see
/// once they are cleared (a `None` field is absent from the desired JSON).
///
/// `None` and an empty collection are equivalent.
fn optional_fields_match(existing: &PodSpec, desired: &PodSpec) -> bool {
    if or_empty(&existing.node_selector) != or_empty(&desired.node_selector) {
        return false;
    }
    if existing.containers.len() != desired.containers.len() {
        return false;
    }
    existing.containers.iter().zip(&desired.containers).all(|(current, wanted)| {
        current.name == wanted.name
            && or_empty(&current.args) == or_empty(&wanted.args)
            && env_names(current) == env_names(wanted)
            && mount_paths(current) == mount_paths(wanted)
    })
}

fn or_empty<T: Default + Clone>(value: &Option<T>) -> T {
    value.clone().unwrap_or_default()
}

fn env_names(container: &Container) -> Vec<&str> {
    container.env.iter().flatten().map(|var| var.name.as_str()).collect()
}

fn mount_paths(container: &Container) -> Vec<(&str, &str)> {
    container
        .volume_mounts
        .iter()
        .flatten()
        .map(|mount| (mount.name.as_str(), mount.mount_path.as_str()))
        .collect()
}

/// Copies the controller-owned fields of `desired` onto `existing`, leaving
/// every other field (labels, annotations, update strategy...) untouched.
pub fn merge_into(mut existing: DaemonSet, desired: DaemonSet) -> DaemonSet {
    if let Some(wanted) = controller_ref(&desired).cloned() {
        let refs = existing.metadata.owner_references.get_or_insert_with(Vec::new);
        refs.retain(|r| r.controller != Some(true));
        refs.push(wanted);
    }

    match (existing.spec.as_mut(), desired.spec) {
        (Some(spec), Some(wanted)) => {
            spec.selector = wanted.selector;
            spec.template = wanted.template;
        }
        (None, wanted) => existing.spec = wanted,
        (Some(_), None) => {}
    }
    existing
}

fn controller_ref(daemon_set: &DaemonSet) -> Option<&OwnerReference> {
    daemon_set
        .metadata
        .owner_references
        .as_ref()?
        .iter()
        .find(|r| r.controller == Some(true))
}

/// True when every field present in `desired` has an equal value in `actual`.
///
/// Fields only present in `actual` (server defaults) are ignored. Arrays must
/// match in length and order.
fn is_subset(desired: &Value, actual: &Value) -> bool {
    match (desired, actual) {
        (Value::Object(wanted), Value::Object(current)) => wanted
            .iter()
            .all(|(key, value)| is_subset(value, current.get(key).unwrap_or(&Value::Null))),
        (Value::Object(wanted), Value::Null) => wanted.is_empty(),
        (Value::Array(wanted), Value::Array(current)) => {
            wanted.len() == current.len() && wanted.iter().zip(current).all(|(w, c)| is_subset(w, c))
        }
        (Value::Null, _) => true,
        (wanted, current) => wanted == current,
    }
}
