//! Skyform cloud API client
//!
//! Implements the SDK side of [`skyform_cloud::ResourceApi`] over the
//! provider's REST API.
//!
//! # Example
//!
//! ```ignore
//! use skyform_api::{ClientConfig, CloudClient, RestResource};
//! use std::sync::Arc;
//!
//! let client = Arc::new(CloudClient::new(ClientConfig::new(
//!     "https://api.example.cloud",
//!     token,
//! ))?);
//! let volumes = RestResource::<Volume>::new(client.clone());
//! ```

pub mod client;
pub mod rest;

pub use client::{ClientConfig, CloudClient, Verb};
pub use rest::{RestCall, RestKind, RestResource, created_handle};
