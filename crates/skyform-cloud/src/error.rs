//! Reconciliation error types

use crate::action::Operation;
use crate::sdk::ApiError;
use crate::state::ResourceState;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to the orchestrator by reconcilers and the poll driver
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("invalid {kind} configuration: {message}")]
    Validation { kind: &'static str, message: String },

    #[error("{operation} of {kind} {handle} failed: {source}")]
    Api {
        kind: &'static str,
        handle: String,
        operation: Operation,
        #[source]
        source: ApiError,
    },

    #[error(
        "{kind} {handle} entered error status {status:?} during {operation} (waiting for {target:?})"
    )]
    RemoteError {
        kind: &'static str,
        handle: String,
        operation: Operation,
        status: String,
        target: String,
    },

    #[error(
        "timed out after {waited:?} waiting for {kind} {handle} to reach {target:?} during {operation} (last status: {})",
        .last_status.as_deref().unwrap_or("none")
    )]
    Timeout {
        kind: &'static str,
        handle: String,
        operation: Operation,
        target: String,
        waited: Duration,
        last_status: Option<String>,
    },

    #[error(
        "{kind} {handle} reported unrecognized status {status:?} until the deadline while waiting for {target:?} during {operation}"
    )]
    UnrecognizedStatus {
        kind: &'static str,
        handle: String,
        operation: Operation,
        status: String,
        target: String,
    },

    #[error("{operation} of {kind} {handle} was cancelled")]
    Cancelled {
        kind: &'static str,
        handle: String,
        operation: Operation,
    },

    #[error("{kind} {handle} not found")]
    NotFound { kind: &'static str, handle: String },

    #[error("invalid import identifier {id:?} for {kind}: expected {expected}")]
    InvalidImportId {
        kind: &'static str,
        id: String,
        expected: &'static str,
    },

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn validation(kind: &'static str, message: impl Into<String>) -> Self {
        CloudError::Validation {
            kind,
            message: message.into(),
        }
    }

    /// Whether the failure happened before any remote object was touched
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CloudError::Validation { .. } | CloudError::InvalidImportId { .. } | CloudError::Json(_)
        )
    }

    /// Whether the deadline expired while the resource was still converging
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            CloudError::Timeout { .. } | CloudError::UnrecognizedStatus { .. }
        )
    }

    /// Status observed on the backend when the failure happened, if any
    pub fn observed_status(&self) -> Option<&str> {
        match self {
            CloudError::RemoteError { status, .. } | CloudError::UnrecognizedStatus { status, .. } => {
                Some(status)
            }
            CloudError::Timeout { last_status, .. } => last_status.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

/// A failed create or update that may already have produced a remote object
///
/// `state` holds whatever is known about the remote object when the failure
/// happened. The orchestrator must persist it so the next run can reconcile
/// or destroy the object instead of losing track of it.
#[derive(Debug)]
pub struct ApplyError {
    pub error: CloudError,
    pub state: Option<ResourceState>,
}

impl ApplyError {
    pub fn with_state(error: CloudError, state: ResourceState) -> Self {
        Self {
            error,
            state: Some(state),
        }
    }
}

impl From<CloudError> for ApplyError {
    fn from(error: CloudError) -> Self {
        Self { error, state: None }
    }
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ApplyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
