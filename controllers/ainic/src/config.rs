//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use crate::reconciler::DEFAULT_REQUEUE_INTERVAL;
use crate::workload::{DEFAULT_SERVICE_ACCOUNT, WorkloadSettings};
use agent_specs::AgentOptions;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 4;
const DEFAULT_PROBE_ADDR: &str = "0.0.0.0:8081";

/// Runtime settings for the AINIC Controller
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Delay before a healthy object is checked again
    pub requeue_interval: Duration,
    /// Upper bound on reconciles running at once across objects
    pub max_concurrent_reconciles: u16,
    /// Service account for driver pods
    pub driver_service_account: String,
    /// Listen address for `/healthz`, `/readyz` and `/metrics`
    pub probe_addr: SocketAddr,
    /// Toggles for the config-manager and node-labeller builders in
    /// `agent-specs`. The AINIC reconcile path does not read them; they are
    /// resolved here so every agent consumer shares one parse of the
    /// environment.
    pub agent_options: AgentOptions,
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let requeue_secs = match get("REQUEUE_INTERVAL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ControllerError::InvalidConfig(format!("REQUEUE_INTERVAL_SECS={}: {}", raw, e))
            })?,
            None => DEFAULT_REQUEUE_INTERVAL.as_secs(),
        };
        if requeue_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "REQUEUE_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        let max_concurrent_reconciles = match get("MAX_CONCURRENT_RECONCILES") {
            Some(raw) => raw.parse::<u16>().map_err(|e| {
                ControllerError::InvalidConfig(format!("MAX_CONCURRENT_RECONCILES={}: {}", raw, e))
            })?,
            None => DEFAULT_MAX_CONCURRENT_RECONCILES,
        };

        let probe_raw = get("PROBE_ADDR").unwrap_or_else(|| DEFAULT_PROBE_ADDR.to_string());
        let probe_addr = probe_raw
            .parse::<SocketAddr>()
            .map_err(|e| ControllerError::InvalidConfig(format!("PROBE_ADDR={}: {}", probe_raw, e)))?;

        Ok(Self {
            namespace: get("WATCH_NAMESPACE"),
            requeue_interval: Duration::from_secs(requeue_secs),
            max_concurrent_reconciles,
            driver_service_account: get("DRIVER_SERVICE_ACCOUNT")
                .unwrap_or_else(|| DEFAULT_SERVICE_ACCOUNT.to_string()),
            probe_addr,
            agent_options: AgentOptions {
                sim_enabled: get("SIM_ENABLE").is_some_and(|v| parse_flag(&v)),
                is_openshift: get("IS_OPENSHIFT").is_some_and(|v| parse_flag(&v)),
            },
        })
    }

    /// Settings for the driver DaemonSet builder
    pub fn workload_settings(&self) -> WorkloadSettings {
        WorkloadSettings {
            service_account: self.driver_service_account.clone(),
        }
    }
}

/// Lenient boolean: anything but a recognised "on" value is false.
fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
