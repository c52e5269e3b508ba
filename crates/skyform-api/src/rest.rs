//! Generic REST resource client
//!
//! Resource kinds describe where they live in the API ([`RestKind`]);
//! [`RestResource`] turns that description into a [`ResourceApi`].

use crate::client::{CloudClient, Verb};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use skyform_cloud::{ApiError, Handle, ResourceApi, ResourceKind};
use std::marker::PhantomData;
use std::sync::Arc;

/// A mutating call applying one delta
#[derive(Debug, Clone, PartialEq)]
pub struct RestCall {
    pub verb: Verb,
    /// Sub-path appended to the item path (e.g. `resize`)
    pub action: Option<&'static str>,
    pub body: serde_json::Value,
}

impl RestCall {
    pub fn patch(body: serde_json::Value) -> Self {
        Self {
            verb: Verb::Patch,
            action: None,
            body,
        }
    }

    pub fn action(action: &'static str, body: serde_json::Value) -> Self {
        Self {
            verb: Verb::Post,
            action: Some(action),
            body,
        }
    }
}

/// REST description of a resource kind
///
/// Responses wrap the object in an envelope key, e.g.
/// `{"volume": {"id": "...", "status": "creating", ...}}`.
pub trait RestKind: ResourceKind<Detail: DeserializeOwned> {
    /// Envelope key of single-object responses
    const ENVELOPE: &'static str;

    /// Field of the created object holding its id
    const ID_FIELD: &'static str = "id";

    /// Collection path, below the parent for sub-resources
    fn collection(parent: Option<&str>) -> String;

    /// Parent handle a new object is created under
    fn parent_of(_spec: &Self::Spec) -> Option<String> {
        None
    }

    fn create_body(spec: &Self::Spec) -> serde_json::Value;

    fn update_call(delta: &Self::Delta) -> RestCall;
}

fn item_path<K: RestKind>(handle: &Handle) -> String {
    format!("{}/{}", K::collection(handle.parent()), handle.id())
}

fn unwrap_envelope<K: RestKind>(mut body: serde_json::Value) -> Result<serde_json::Value, ApiError> {
    match body.get_mut(K::ENVELOPE) {
        Some(inner) => Ok(inner.take()),
        None => Err(ApiError::Decode(format!(
            "response has no \"{}\" object",
            K::ENVELOPE
        ))),
    }
}

/// Handle of a freshly created object, taken from the unwrapped response
pub fn created_handle<K: RestKind>(
    parent: Option<String>,
    created: &serde_json::Value,
) -> Result<Handle, ApiError> {
    let id = created
        .get(K::ID_FIELD)
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            ApiError::Decode(format!("created object has no \"{}\"", K::ID_FIELD))
        })?;

    Ok(match parent {
        Some(parent) => Handle::child(parent, id),
        None => Handle::new(id),
    })
}

/// [`ResourceApi`] backed by the REST API
pub struct RestResource<K> {
    client: Arc<CloudClient>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> RestResource<K> {
    pub fn new(client: Arc<CloudClient>) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<K: RestKind> ResourceApi<K> for RestResource<K> {
    async fn create(&self, spec: &K::Spec) -> Result<Handle, ApiError> {
        let parent = K::parent_of(spec);
        let mut body = serde_json::Map::new();
        body.insert(K::ENVELOPE.to_string(), K::create_body(spec));
        let body = serde_json::Value::Object(body);
        let response: serde_json::Value = self
            .client
            .post_json(&K::collection(parent.as_deref()), &body)
            .await?;

        let created = unwrap_envelope::<K>(response)?;
        created_handle::<K>(parent, &created)
    }

    async fn get(&self, handle: &Handle) -> Result<K::Detail, ApiError> {
        let response: serde_json::Value = self.client.get_json(&item_path::<K>(handle)).await?;
        serde_json::from_value(unwrap_envelope::<K>(response)?)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn update(&self, handle: &Handle, delta: &K::Delta) -> Result<(), ApiError> {
        let call = K::update_call(delta);
        let mut path = item_path::<K>(handle);
        if let Some(action) = call.action {
            path.push('/');
            path.push_str(action);
        }
        self.client.send(call.verb, &path, &call.body).await
    }

    async fn delete(&self, handle: &Handle) -> Result<(), ApiError> {
        self.client.delete(&item_path::<K>(handle)).await
    }
}
