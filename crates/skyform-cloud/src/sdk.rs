//! Cloud SDK collaborator contract
//!
//! The reconcilers never talk HTTP themselves. They consume a typed CRUD
//! client per resource kind ([`ResourceApi`]) and inspect the errors it
//! returns through [`ApiError::is_not_found`] and [`ApiError::is_transient`].

use crate::kind::ResourceKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error value returned by SDK calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ApiError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(404, message)
    }

    /// The remote object does not exist (any more)
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }

    /// A single call failed for reasons unrelated to the request itself
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            ApiError::Transport(_) => true,
            ApiError::Decode(_) => false,
        }
    }
}

/// Backend-assigned identifier of a remote resource instance
///
/// Sub-resources (node groups, volume attachments) are addressed through
/// their parent, and render as `parent,id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    parent: Option<String>,
    id: String,
}

impl Handle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            parent: None,
            id: id.into(),
        }
    }

    pub fn child(parent: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Parse `id` (or `parent,id` when `composite` is set)
    pub fn parse(raw: &str, composite: bool) -> Option<Self> {
        let raw = raw.trim();
        if composite {
            let (parent, id) = raw.split_once(',')?;
            let (parent, id) = (parent.trim(), id.trim());
            if parent.is_empty() || id.is_empty() || id.contains(',') {
                return None;
            }
            Some(Self::child(parent, id))
        } else if raw.is_empty() || raw.contains(',') {
            None
        } else {
            Some(Self::new(raw))
        }
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{},{}", parent, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Typed CRUD client for one resource kind
#[async_trait]
pub trait ResourceApi<K: ResourceKind>: Send + Sync {
    /// Issue the create call and return the handle of the new object
    async fn create(&self, spec: &K::Spec) -> Result<Handle, ApiError>;

    /// Fetch the current remote detail
    async fn get(&self, handle: &Handle) -> Result<K::Detail, ApiError>;

    /// Apply a single field-group change
    async fn update(&self, handle: &Handle, delta: &K::Delta) -> Result<(), ApiError>;

    /// Issue the delete call
    async fn delete(&self, handle: &Handle) -> Result<(), ApiError>;
}
