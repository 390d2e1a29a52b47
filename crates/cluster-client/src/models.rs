//! Identity and lookup types shared by every accessor implementation

use crate::error::ClusterError;
use kube::Resource;
use std::fmt;

/// Namespaced identity of a cluster object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    /// Creates a key from a namespace and a name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Derives the key from an object's metadata.
    ///
    /// Objects without a namespace are placed in `default`, matching how the
    /// API server treats namespaced kinds submitted without one.
    pub fn from_resource<K: Resource>(resource: &K) -> Result<Self, ClusterError> {
        let meta = resource.meta();
        let name = meta
            .name
            .clone()
            .ok_or_else(|| ClusterError::InvalidObject("object is missing metadata.name".to_string()))?;
        let namespace = meta.namespace.clone().unwrap_or_else(|| "default".to_string());
        Ok(Self { namespace, name })
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Result of reading an object that may legitimately not exist.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
}

impl<T> Lookup<T> {
    /// Converts into an `Option`, dropping the distinction's name.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(found) => Self::Found(found),
            None => Self::Absent,
        }
    }
}
