//! Resource kind descriptions
//!
//! A [`ResourceKind`] carries everything that differs between backend
//! services: the status alphabet, the literal timing constants, the status
//! awaited after each operation and how a desired spec is diffed against the
//! observed detail. The generic [`Reconciler`](crate::Reconciler) supplies
//! the rest.

use crate::error::Result;
use crate::policy::Timings;
use crate::sdk::Handle;
use crate::state::ResourceState;
use crate::status::StatusAlphabet;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

pub trait ResourceKind: Send + Sync + 'static {
    /// Orchestrator-facing type name (e.g. `skyform_volume`)
    const TYPE_NAME: &'static str;

    const ALPHABET: StatusAlphabet;

    const TIMINGS: Timings;

    /// Canonical status after a successful create or update
    const ACTIVE: &'static str;

    /// Other steady statuses an in-place update leaves unchanged
    /// (e.g. an attached volume stays `in-use`)
    const SETTLED: &'static [&'static str] = &[];

    /// Statuses meaning a delete is already in progress
    const DELETING: &'static [&'static str] = &[];

    /// Terminal status of a deleted object, for backends that keep
    /// tombstones instead of answering "not found"
    const DELETED: Option<&'static str> = None;

    /// Addressed as `parent,id`
    const COMPOSITE_HANDLE: bool = false;

    /// Desired configuration, as planned by the orchestrator
    type Spec: DeserializeOwned + Serialize + Clone + Debug + Send + Sync;

    /// Remote object as returned by the SDK
    type Detail: Clone + Debug + Send + Sync;

    /// One field-group change applied by a single update call
    type Delta: Debug + Send + Sync;

    /// Reject malformed input before any mutating call
    fn validate(_spec: &Self::Spec) -> Result<()> {
        Ok(())
    }

    fn status(detail: &Self::Detail) -> &str;

    /// Auxiliary readiness gate, checked once the status matches the target
    fn ready(_detail: &Self::Detail) -> bool {
        true
    }

    fn create_target(_spec: &Self::Spec) -> &'static str {
        Self::ACTIVE
    }

    /// Status awaited after applying `delta` to an object currently at
    /// `current`
    fn update_target(_delta: &Self::Delta, current: &str) -> &'static str {
        Self::SETTLED
            .iter()
            .copied()
            .find(|settled| *settled == current)
            .unwrap_or(Self::ACTIVE)
    }

    /// Changes needed to move `current` to `desired`, in application order
    fn plan_update(current: &Self::Detail, desired: &Self::Spec) -> Result<Vec<Self::Delta>>;

    fn to_state(handle: &Handle, detail: &Self::Detail) -> ResourceState;

    fn is_deleting(status: &str) -> bool {
        Self::DELETING.contains(&status)
    }

    fn parse_handle(raw: &str) -> Option<Handle> {
        Handle::parse(raw, Self::COMPOSITE_HANDLE)
    }

    fn import_format() -> &'static str {
        if Self::COMPOSITE_HANDLE {
            "<parent_id>,<id>"
        } else {
            "<id>"
        }
    }
}
