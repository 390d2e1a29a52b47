//! AINIC Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the AINIC network operator.

pub mod ainic;
pub mod network_config;

pub use ainic::*;
pub use network_config::*;
