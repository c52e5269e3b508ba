//! Generic reconciler
//!
//! Composes the SDK client of one resource kind with the poll driver:
//! create → poll, update → (mutate → poll)*, delete → poll for absence.

use crate::action::Operation;
use crate::error::{ApplyError, CloudError, Result};
use crate::kind::ResourceKind;
use crate::policy::PollPolicy;
use crate::poll::{Observation, PollMode, PollSession, poll_until};
use crate::sdk::{ApiError, Handle, ResourceApi};
use crate::state::ResourceState;
use crate::status::StatusClass;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Placeholder handle reported for failures before the backend assigned one
const NEW_HANDLE: &str = "(new)";

/// Drives instances of one resource kind through their lifecycle
pub struct Reconciler<K: ResourceKind> {
    api: Arc<dyn ResourceApi<K>>,
    policy: PollPolicy,
}

impl<K: ResourceKind> Reconciler<K> {
    pub fn new(api: Arc<dyn ResourceApi<K>>) -> Self {
        Self {
            api,
            policy: PollPolicy::new(K::TIMINGS),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    fn api_error(&self, handle: impl Into<String>, operation: Operation, source: ApiError) -> CloudError {
        CloudError::Api {
            kind: K::TYPE_NAME,
            handle: handle.into(),
            operation,
            source,
        }
    }

    fn cancelled(&self, handle: &Handle, operation: Operation) -> CloudError {
        CloudError::Cancelled {
            kind: K::TYPE_NAME,
            handle: handle.to_string(),
            operation,
        }
    }

    fn session<'a>(
        &'a self,
        handle: &Handle,
        operation: Operation,
        target: &'a str,
        mode: PollMode,
    ) -> PollSession<'a> {
        PollSession {
            kind: K::TYPE_NAME,
            handle: handle.to_string(),
            operation,
            target,
            timeout: self.policy.timings.timeout_for(operation),
            interval: self.policy.timings.interval,
            mode,
            transient_retry: self.policy.transient_retry.as_ref(),
        }
    }

    /// State recorded when an operation fails after the object exists
    fn partial_state(
        &self,
        handle: &Handle,
        known: Option<&K::Detail>,
        error: &CloudError,
    ) -> ResourceState {
        let mut state = match known {
            Some(detail) => K::to_state(handle, detail),
            None => ResourceState::new(handle.to_string(), K::TYPE_NAME),
        };
        if let Some(status) = error.observed_status() {
            state.status = status.to_string();
        }
        state
    }

    /// Single GET, raced against cancellation
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        handle: &Handle,
        operation: Operation,
    ) -> Result<std::result::Result<K::Detail, ApiError>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(self.cancelled(handle, operation)),
            fetched = self.api.get(handle) => Ok(fetched),
        }
    }

    /// Wait for `handle` to reach `target` after a create or update call
    ///
    /// The last detail fetched is left in `last_seen`, also when the wait
    /// fails.
    async fn converge(
        &self,
        cancel: &CancellationToken,
        handle: &Handle,
        operation: Operation,
        target: &str,
        last_seen: &mut Option<K::Detail>,
    ) -> Result<K::Detail> {
        let alphabet = K::ALPHABET;
        let classifier = alphabet.targeting(target);
        let session = self.session(handle, operation, target, PollMode::Converge);
        let api = self.api.as_ref();
        let seen = Mutex::new(None);
        let record = &seen;

        let settled = poll_until(cancel, &session, &classifier, K::ready, move || async move {
            api.get(handle).await.map(|detail| {
                if let Ok(mut slot) = record.lock() {
                    *slot = Some(detail.clone());
                }
                Observation::new(K::status(&detail).to_string(), detail)
            })
        })
        .await;

        if let Some(detail) = seen.into_inner().unwrap_or_else(PoisonError::into_inner) {
            *last_seen = Some(detail);
        }
        settled?.into_detail().ok_or_else(|| CloudError::NotFound {
            kind: K::TYPE_NAME,
            handle: handle.to_string(),
        })
    }

    /// Wait until `handle` is gone (not found, or a tombstone status)
    ///
    /// An error status the object already had before the delete call is
    /// waited out; only error statuses appearing afterwards are fatal.
    async fn confirm_deletion(
        &self,
        cancel: &CancellationToken,
        handle: &Handle,
        before: &str,
    ) -> Result<()> {
        let deleted = K::DELETED;
        let target = deleted.unwrap_or("not found");
        let classify = move |raw: &str| -> StatusClass {
            if Some(raw) == deleted {
                StatusClass::Success
            } else if K::ALPHABET.is_error(raw) {
                if raw == before {
                    StatusClass::Pending
                } else {
                    StatusClass::Error
                }
            } else if K::ALPHABET.known.contains(&raw) {
                StatusClass::Pending
            } else {
                StatusClass::Unknown
            }
        };
        let session = self.session(handle, Operation::Delete, target, PollMode::ConfirmDeletion);
        let api = self.api.as_ref();

        poll_until(
            cancel,
            &session,
            &classify,
            |_: &K::Detail| true,
            move || async move {
                api.get(handle)
                    .await
                    .map(|detail| Observation::new(K::status(&detail).to_string(), detail))
            },
        )
        .await?;
        Ok(())
    }

    /// Create the remote object and wait until it is active
    ///
    /// A failure after the backend returned a handle carries the handle in
    /// [`ApplyError::state`]; the object is never rolled back.
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        spec: &K::Spec,
    ) -> std::result::Result<ResourceState, ApplyError> {
        K::validate(spec)?;
        if cancel.is_cancelled() {
            return Err(CloudError::Cancelled {
                kind: K::TYPE_NAME,
                handle: NEW_HANDLE.to_string(),
                operation: Operation::Create,
            }
            .into());
        }

        let handle = self
            .api
            .create(spec)
            .await
            .map_err(|source| self.api_error(NEW_HANDLE, Operation::Create, source))?;
        tracing::info!(kind = K::TYPE_NAME, handle = %handle, "create accepted");

        let target = K::create_target(spec);
        let mut last_seen = None;
        match self
            .converge(cancel, &handle, Operation::Create, target, &mut last_seen)
            .await
        {
            Ok(detail) => Ok(K::to_state(&handle, &detail)),
            Err(error) => {
                tracing::warn!(
                    kind = K::TYPE_NAME,
                    handle = %handle,
                    error = %error,
                    "create did not converge, keeping handle in state"
                );
                let state = self.partial_state(&handle, last_seen.as_ref(), &error);
                Err(ApplyError::with_state(error, state))
            }
        }
    }

    /// Re-read the remote object. `Ok(None)` means it no longer exists.
    pub async fn read(
        &self,
        cancel: &CancellationToken,
        handle: &Handle,
    ) -> Result<Option<ResourceState>> {
        match self.fetch(cancel, handle, Operation::Read).await? {
            Ok(detail) => Ok(Some(K::to_state(handle, &detail))),
            Err(err) if err.is_not_found() => {
                tracing::warn!(
                    kind = K::TYPE_NAME,
                    handle = %handle,
                    "resource disappeared outside of the provider"
                );
                Ok(None)
            }
            Err(source) => Err(self.api_error(handle.to_string(), Operation::Read, source)),
        }
    }

    /// Apply the changed field groups one by one, waiting for the object to
    /// settle after each call
    pub async fn update(
        &self,
        cancel: &CancellationToken,
        handle: &Handle,
        desired: &K::Spec,
    ) -> std::result::Result<ResourceState, ApplyError> {
        K::validate(desired)?;

        let mut latest = self
            .fetch(cancel, handle, Operation::Update)
            .await?
            .map_err(|source| self.api_error(handle.to_string(), Operation::Update, source))?;

        let deltas = K::plan_update(&latest, desired)?;
        if deltas.is_empty() {
            tracing::debug!(kind = K::TYPE_NAME, handle = %handle, "no changes");
            return Ok(K::to_state(handle, &latest));
        }

        for delta in deltas {
            if cancel.is_cancelled() {
                let error = self.cancelled(handle, Operation::Update);
                let state = self.partial_state(handle, Some(&latest), &error);
                return Err(ApplyError::with_state(error, state));
            }

            tracing::info!(kind = K::TYPE_NAME, handle = %handle, change = ?delta, "applying change");
            if let Err(source) = self.api.update(handle, &delta).await {
                let error = self.api_error(handle.to_string(), Operation::Update, source);
                let state = self.partial_state(handle, Some(&latest), &error);
                return Err(ApplyError::with_state(error, state));
            }

            let target = K::update_target(&delta, K::status(&latest));
            let mut last_seen = None;
            latest = match self
                .converge(cancel, handle, Operation::Update, target, &mut last_seen)
                .await
            {
                Ok(detail) => detail,
                Err(error) => {
                    let known = last_seen.as_ref().unwrap_or(&latest);
                    let state = self.partial_state(handle, Some(known), &error);
                    return Err(ApplyError::with_state(error, state));
                }
            };
        }

        Ok(K::to_state(handle, &latest))
    }

    /// Delete the remote object and wait until it is gone
    ///
    /// An object already being deleted is not deleted again.
    pub async fn delete(&self, cancel: &CancellationToken, handle: &Handle) -> Result<()> {
        let current = match self.fetch(cancel, handle, Operation::Delete).await? {
            Ok(detail) => detail,
            Err(err) if err.is_not_found() => {
                tracing::info!(kind = K::TYPE_NAME, handle = %handle, "already deleted");
                return Ok(());
            }
            Err(source) => {
                return Err(self.api_error(handle.to_string(), Operation::Delete, source));
            }
        };

        let status = K::status(&current);
        if K::DELETED == Some(status) {
            tracing::info!(kind = K::TYPE_NAME, handle = %handle, "already deleted");
            return Ok(());
        }

        if K::is_deleting(status) {
            tracing::info!(
                kind = K::TYPE_NAME,
                handle = %handle,
                status,
                "delete already in progress, waiting"
            );
        } else {
            match self.api.delete(handle).await {
                Ok(()) => {
                    tracing::info!(kind = K::TYPE_NAME, handle = %handle, "delete accepted");
                }
                Err(err) if err.is_not_found() => return Ok(()),
                Err(source) => {
                    return Err(self.api_error(handle.to_string(), Operation::Delete, source));
                }
            }
        }

        self.confirm_deletion(cancel, handle, status).await
    }

    /// Adopt an existing object from an externally supplied identifier
    pub async fn import(&self, cancel: &CancellationToken, raw_id: &str) -> Result<ResourceState> {
        let handle = K::parse_handle(raw_id).ok_or_else(|| CloudError::InvalidImportId {
            kind: K::TYPE_NAME,
            id: raw_id.to_string(),
            expected: K::import_format(),
        })?;

        self.read(cancel, &handle)
            .await?
            .ok_or_else(|| CloudError::NotFound {
                kind: K::TYPE_NAME,
                handle: handle.to_string(),
            })
    }
}
