//! Cluster accessor for the AINIC controller
//!
//! Typed read/write access to the two object kinds the controller manages:
//! `AINIC` custom resources and the driver `DaemonSet`s derived from them.
//!
//! # Example
//!
//! ```no_run
//! use cluster_client::{ClusterClientTrait, KubeClusterClient, Lookup, ObjectKey};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeClusterClient::new(kube::Client::try_default().await?);
//!
//! let key = ObjectKey::new("kube-amd-network", "ainic-sample");
//! if let Lookup::Found(ainic) = client.get_ainic(&key).await? {
//!     println!("driver image: {}", ainic.spec.driver.image);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Optimistic concurrency**: updates carry `resourceVersion` and surface
//!   stale writes as [`ClusterError::Conflict`]
//! - **Not-found tolerance**: reads return [`Lookup::Absent`], deletes of
//!   missing objects succeed
//! - **test-util**: an in-memory [`MockClusterClient`] for unit tests

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use error::ClusterError;
pub use models::{Lookup, ObjectKey};
#[cfg(feature = "test-util")]
pub use mock::{MockClusterClient, MockOperation};
