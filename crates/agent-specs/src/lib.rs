//! Agent pod fragments
//!
//! Builds the container, volume and placement fragments for the two per-node
//! helper agents configured by a `NetworkConfig`:
//!
//! - **config manager**: applies NIC configuration on each node
//! - **node labeller**: publishes NIC capabilities as node labels and manages
//!   the host's ionic module blacklist
//!
//! Builders are pure. Settings that used to come from the process environment
//! are passed in explicitly through [`AgentOptions`].

pub mod config_manager;
pub mod node_labeller;

use crds::{AgentToleration, UpgradePolicy};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, HostPathVolumeSource, LocalObjectReference, ObjectFieldSelector,
    PodSpec, SecurityContext, Toleration, Volume, VolumeMount,
};
use serde::Serialize;
use std::collections::BTreeMap;

pub use config_manager::build_config_manager_spec;
pub use node_labeller::build_node_labeller_spec;

/// Default image for agent init containers
pub const DEFAULT_INIT_CONTAINER_IMAGE: &str = "busybox:1.36";

/// Shell loop that blocks until the ionic driver has registered with the kernel.
pub(crate) const WAIT_FOR_DRIVER_SCRIPT: &str = "while [ ! -d /sys/class/infiniband ] || \
[ ! -d /sys/class/infiniband_verbs ] || \
[ ! -d /sys/module/ionic/drivers ]; do \
echo \"amd ionic driver is not loaded\"; \
sleep 2; \
done";

/// Deployment toggles that are not part of the `NetworkConfig` object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentOptions {
    /// Nodes are simulated; skip waiting for real hardware
    pub sim_enabled: bool,
    /// Target cluster is OpenShift, where the host module config is managed elsewhere
    pub is_openshift: bool,
}

/// Everything needed to render one agent DaemonSet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    pub name: String,
    pub namespace: String,
    pub enable: bool,
    pub service_account_name: String,
    pub tolerations: Vec<Toleration>,
    pub upgrade_policy: Option<UpgradePolicy>,
    pub selector: BTreeMap<String, String>,
    pub init_containers: Vec<InitContainerSpec>,
    pub main_container: MainContainerSpec,
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitContainerSpec {
    pub name: String,
    /// User override; `default_image` is used when unset
    pub image: Option<String>,
    pub default_image: String,
    pub command: Vec<String>,
    pub privileged: bool,
    pub env: Vec<EnvVar>,
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MainContainerSpec {
    pub name: String,
    /// User override; `default_image` is used when unset
    pub image: Option<String>,
    pub default_image: String,
    pub image_pull_policy: Option<String>,
    pub image_registry_secret: Option<String>,
    pub privileged: bool,
    pub env: Vec<EnvVar>,
    pub volume_mounts: Vec<VolumeMount>,
}

impl InitContainerSpec {
    /// Image to run, honouring the override
    pub fn effective_image(&self) -> &str {
        effective_image(self.image.as_deref(), &self.default_image)
    }

    fn to_container(&self) -> Container {
        Container {
            name: self.name.clone(),
            image: Some(self.effective_image().to_string()),
            command: (!self.command.is_empty()).then(|| self.command.clone()),
            env: (!self.env.is_empty()).then(|| self.env.clone()),
            volume_mounts: Some(self.volume_mounts.clone()),
            security_context: Some(privileged(self.privileged)),
            ..Default::default()
        }
    }
}

impl MainContainerSpec {
    /// Image to run, honouring the override
    pub fn effective_image(&self) -> &str {
        effective_image(self.image.as_deref(), &self.default_image)
    }

    fn to_container(&self) -> Container {
        Container {
            name: self.name.clone(),
            image: Some(self.effective_image().to_string()),
            image_pull_policy: self.image_pull_policy.clone(),
            env: (!self.env.is_empty()).then(|| self.env.clone()),
            volume_mounts: Some(self.volume_mounts.clone()),
            security_context: Some(privileged(self.privileged)),
            ..Default::default()
        }
    }
}

impl AgentSpec {
    /// Renders the pod template body for the agent DaemonSet.
    pub fn pod_spec(&self) -> PodSpec {
        PodSpec {
            service_account_name: Some(self.service_account_name.clone()),
            node_selector: (!self.selector.is_empty()).then(|| self.selector.clone()),
            tolerations: (!self.tolerations.is_empty()).then(|| self.tolerations.clone()),
            image_pull_secrets: self.main_container.image_registry_secret.as_ref().map(|secret| {
                vec![LocalObjectReference {
                    name: secret.clone(),
                }]
            }),
            init_containers: Some(self.init_containers.iter().map(InitContainerSpec::to_container).collect()),
            containers: vec![self.main_container.to_container()],
            volumes: Some(self.volumes.clone()),
            ..Default::default()
        }
    }
}

fn effective_image<'a>(image: Option<&'a str>, default_image: &'a str) -> &'a str {
    match image {
        Some(image) if !image.is_empty() => image,
        _ => default_image,
    }
}

fn privileged(enabled: bool) -> SecurityContext {
    SecurityContext {
        privileged: Some(enabled),
        ..Default::default()
    }
}

pub(crate) fn tolerations(input: &[AgentToleration]) -> Vec<Toleration> {
    input
        .iter()
        .map(|t| Toleration {
            key: t.key.clone(),
            operator: t.operator.clone(),
            value: t.value.clone(),
            effect: t.effect.clone(),
            toleration_seconds: t.toleration_seconds,
        })
        .collect()
}

pub(crate) fn field_env(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: field_path.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(crate) fn value_env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

pub(crate) fn mount(name: &str, mount_path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: mount_path.to_string(),
        ..Default::default()
    }
}

pub(crate) fn host_path(name: &str, path: &str, path_type: &str) -> Volume {
    Volume {
        name: name.to_string(),
        host_path: Some(HostPathVolumeSource {
            path: path.to_string(),
            type_: Some(path_type.to_string()),
        }),
        ..Default::default()
    }
}
