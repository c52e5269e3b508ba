//! Observed state of managed resources
//!
//! This is what reconcilers hand back to the orchestrator for persistence.
//! Nothing here is cached between operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// State of a single resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Handle of the remote object (`parent,id` for sub-resources)
    pub id: String,

    /// Resource type name
    pub resource_type: String,

    /// Raw status as last reported by the backend
    pub status: String,

    /// Resource attributes (IP, size, version, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            status: String::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}
