//! Skyform reconciliation core
//!
//! Every asynchronous backend operation follows the same shape: issue a
//! mutating call, then poll the remote object until it reaches a terminal
//! status. This crate owns that shape once for all resource kinds.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │            Orchestrator (plan / apply)           │
//! └─────────────────┬───────────────────────────────┘
//!                   │ create / read / update / delete / import
//! ┌─────────────────▼───────────────────────────────┐
//! │                 skyform-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   Provider → ManagedResource             │   │
//! │  │   Reconciler<K: ResourceKind>            │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────────────┐     │
//! │  │ poll_until   │  │  StatusClassifier    │     │
//! │  └──────────────┘  └──────────────────────┘     │
//! └───────┬─────────────────────────────────────────┘
//!         │ ResourceApi<K>
//! ┌───────▼───────┐
//! │  cloud SDK    │
//! └───────────────┘
//! ```

pub mod action;
pub mod error;
pub mod kind;
pub mod lifecycle;
pub mod policy;
pub mod poll;
pub mod reconciler;
pub mod sdk;
pub mod state;
pub mod status;

// Re-exports
pub use action::Operation;
pub use error::{ApplyError, CloudError, Result};
pub use kind::ResourceKind;
pub use lifecycle::{Diagnostic, LifecycleResponse, ManagedResource, Provider, Severity};
pub use policy::{PollPolicy, RetryConfig, TimingOverrides, Timings};
pub use poll::{Observation, PollMode, PollSession, Settled, poll_until};
pub use reconciler::Reconciler;
pub use sdk::{ApiError, Handle, ResourceApi};
pub use state::ResourceState;
pub use status::{Classify, ErrorMarker, StatusAlphabet, StatusClass, StatusClassifier};
pub use tokio_util::sync::CancellationToken;
