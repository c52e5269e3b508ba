//! Orchestrator-facing lifecycle contract
//!
//! The orchestrator plans, diffs and persists state on its own; it calls
//! into the provider with JSON values and waits for each call, including any
//! polling, to return. Failures come back as diagnostics next to whatever
//! state must be persisted.

use crate::action::Operation;
use crate::error::{ApplyError, CloudError};
use crate::kind::ResourceKind;
use crate::reconciler::Reconciler;
use crate::sdk::Handle;
use crate::state::ResourceState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A message returned to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Error diagnostic whose summary tells timeouts apart from failed
    /// resources and rejected input
    pub fn from_error(type_name: &str, operation: Operation, error: &CloudError) -> Self {
        let summary = match error {
            CloudError::Timeout { .. } | CloudError::UnrecognizedStatus { .. } => {
                format!("Timed out waiting for {} during {}", type_name, operation)
            }
            CloudError::RemoteError { .. } => {
                format!("{} entered an error state during {}", type_name, operation)
            }
            CloudError::Cancelled { .. } => format!("{} of {} was interrupted", operation, type_name),
            e if e.is_validation() => format!("Invalid {} configuration", type_name),
            _ => format!("Error during {} of {}", operation, type_name),
        };
        Self::error(summary, error.to_string())
    }
}

/// Result of one lifecycle call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleResponse {
    /// State to persist; `None` removes the resource from state
    pub state: Option<ResourceState>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LifecycleResponse {
    pub fn ok(state: Option<ResourceState>) -> Self {
        Self {
            state,
            diagnostics: Vec::new(),
        }
    }

    pub fn failed(state: Option<ResourceState>, diagnostic: Diagnostic) -> Self {
        Self {
            state,
            diagnostics: vec![diagnostic],
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn from_apply(
        type_name: &str,
        operation: Operation,
        prior: Option<ResourceState>,
        result: std::result::Result<ResourceState, ApplyError>,
    ) -> Self {
        match result {
            Ok(state) => Self::ok(Some(state)),
            Err(ApplyError { error, state }) => Self::failed(
                state.or(prior),
                Diagnostic::from_error(type_name, operation, &error),
            ),
        }
    }
}

/// Lifecycle operations of one resource type
#[async_trait]
pub trait ManagedResource: Send + Sync {
    /// Registered type name (metadata)
    fn type_name(&self) -> &'static str;

    async fn create(&self, cancel: &CancellationToken, planned: &serde_json::Value)
    -> LifecycleResponse;

    async fn read(&self, cancel: &CancellationToken, state: &ResourceState) -> LifecycleResponse;

    async fn update(
        &self,
        cancel: &CancellationToken,
        prior: &ResourceState,
        planned: &serde_json::Value,
    ) -> LifecycleResponse;

    async fn delete(&self, cancel: &CancellationToken, state: &ResourceState) -> LifecycleResponse;

    async fn import(&self, cancel: &CancellationToken, id: &str) -> LifecycleResponse;
}

fn parse_spec<K: ResourceKind>(planned: &serde_json::Value) -> Result<K::Spec, CloudError> {
    serde_json::from_value(planned.clone())
        .map_err(|e| CloudError::validation(K::TYPE_NAME, e.to_string()))
}

fn state_handle<K: ResourceKind>(state: &ResourceState) -> Result<Handle, CloudError> {
    K::parse_handle(&state.id).ok_or_else(|| CloudError::InvalidImportId {
        kind: K::TYPE_NAME,
        id: state.id.clone(),
        expected: K::import_format(),
    })
}

#[async_trait]
impl<K: ResourceKind> ManagedResource for Reconciler<K> {
    fn type_name(&self) -> &'static str {
        K::TYPE_NAME
    }

    async fn create(
        &self,
        cancel: &CancellationToken,
        planned: &serde_json::Value,
    ) -> LifecycleResponse {
        let result = match parse_spec::<K>(planned) {
            Ok(spec) => Reconciler::create(self, cancel, &spec).await,
            Err(e) => Err(e.into()),
        };
        LifecycleResponse::from_apply(K::TYPE_NAME, Operation::Create, None, result)
    }

    async fn read(&self, cancel: &CancellationToken, state: &ResourceState) -> LifecycleResponse {
        let handle = match state_handle::<K>(state) {
            Ok(handle) => handle,
            Err(e) => {
                return LifecycleResponse::failed(
                    Some(state.clone()),
                    Diagnostic::from_error(K::TYPE_NAME, Operation::Read, &e),
                );
            }
        };
        match Reconciler::read(self, cancel, &handle).await {
            Ok(refreshed) => LifecycleResponse::ok(refreshed),
            Err(e) => LifecycleResponse::failed(
                Some(state.clone()),
                Diagnostic::from_error(K::TYPE_NAME, Operation::Read, &e),
            ),
        }
    }

    async fn update(
        &self,
        cancel: &CancellationToken,
        prior: &ResourceState,
        planned: &serde_json::Value,
    ) -> LifecycleResponse {
        let result = match (state_handle::<K>(prior), parse_spec::<K>(planned)) {
            (Ok(handle), Ok(spec)) => Reconciler::update(self, cancel, &handle, &spec).await,
            (Err(e), _) | (_, Err(e)) => Err(e.into()),
        };
        LifecycleResponse::from_apply(K::TYPE_NAME, Operation::Update, Some(prior.clone()), result)
    }

    async fn delete(&self, cancel: &CancellationToken, state: &ResourceState) -> LifecycleResponse {
        let result = match state_handle::<K>(state) {
            Ok(handle) => Reconciler::delete(self, cancel, &handle).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => LifecycleResponse::ok(None),
            Err(e) => LifecycleResponse::failed(
                Some(state.clone()),
                Diagnostic::from_error(K::TYPE_NAME, Operation::Delete, &e),
            ),
        }
    }

    async fn import(&self, cancel: &CancellationToken, id: &str) -> LifecycleResponse {
        match Reconciler::import(self, cancel, id).await {
            Ok(state) => LifecycleResponse::ok(Some(state)),
            Err(e) => LifecycleResponse::failed(
                None,
                Diagnostic::from_error(K::TYPE_NAME, Operation::Import, &e),
            ),
        }
    }
}

/// Registry of the resource types served by this provider
#[derive(Default)]
pub struct Provider {
    resources: BTreeMap<&'static str, Arc<dyn ManagedResource>>,
}

impl Provider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resource: Arc<dyn ManagedResource>) {
        let name = resource.type_name();
        if self.resources.insert(name, resource).is_some() {
            tracing::warn!(resource_type = name, "resource type registered twice, replacing");
        }
    }

    pub fn with_resource(mut self, resource: Arc<dyn ManagedResource>) -> Self {
        self.register(resource);
        self
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    pub fn resource(&self, type_name: &str) -> Result<&Arc<dyn ManagedResource>, CloudError> {
        self.resources
            .get(type_name)
            .ok_or_else(|| CloudError::UnknownResourceType(type_name.to_string()))
    }

    fn unknown(type_name: &str, state: Option<ResourceState>) -> LifecycleResponse {
        LifecycleResponse::failed(
            state,
            Diagnostic::error(
                "Unknown resource type",
                CloudError::UnknownResourceType(type_name.to_string()).to_string(),
            ),
        )
    }

    pub async fn create(
        &self,
        cancel: &CancellationToken,
        type_name: &str,
        planned: &serde_json::Value,
    ) -> LifecycleResponse {
        match self.resource(type_name) {
            Ok(resource) => resource.create(cancel, planned).await,
            Err(_) => Self::unknown(type_name, None),
        }
    }

    pub async fn read(&self, cancel: &CancellationToken, state: &ResourceState) -> LifecycleResponse {
        match self.resource(&state.resource_type) {
            Ok(resource) => resource.read(cancel, state).await,
            Err(_) => Self::unknown(&state.resource_type, Some(state.clone())),
        }
    }

    pub async fn update(
        &self,
        cancel: &CancellationToken,
        prior: &ResourceState,
        planned: &serde_json::Value,
    ) -> LifecycleResponse {
        match self.resource(&prior.resource_type) {
            Ok(resource) => resource.update(cancel, prior, planned).await,
            Err(_) => Self::unknown(&prior.resource_type, Some(prior.clone())),
        }
    }

    pub async fn delete(&self, cancel: &CancellationToken, state: &ResourceState) -> LifecycleResponse {
        match self.resource(&state.resource_type) {
            Ok(resource) => resource.delete(cancel, state).await,
            Err(_) => Self::unknown(&state.resource_type, Some(state.clone())),
        }
    }

    pub async fn import(
        &self,
        cancel: &CancellationToken,
        type_name: &str,
        id: &str,
    ) -> LifecycleResponse {
        match self.resource(type_name) {
            Ok(resource) => resource.import(cancel, id).await,
            Err(_) => Self::unknown(type_name, None),
        }
    }

    /// Look up an existing object by identifier without managing it
    ///
    /// Shares the import path: a single read, no polling.
    pub async fn read_data_source(
        &self,
        cancel: &CancellationToken,
        type_name: &str,
        id: &str,
    ) -> LifecycleResponse {
        self.import(cancel, type_name, id).await
    }
}
