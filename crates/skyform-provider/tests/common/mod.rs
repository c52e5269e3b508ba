use async_trait::async_trait;
use serde::de::DeserializeOwned;
use skyform_cloud::{ApiError, CancellationToken, Handle, ResourceApi, ResourceKind};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One call received by [`FakeApi`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create,
    Get(String),
    Update(String, String),
    Delete(String),
}

/// In-memory SDK scripting the details returned per handle
///
/// Each `get` pops the next scripted response; the last one repeats.
/// Handles without a script answer "not found".
pub struct FakeApi<K: ResourceKind> {
    next_handle: Handle,
    scripts: Mutex<HashMap<String, VecDeque<Result<K::Detail, ApiError>>>>,
    create_error: Mutex<Option<ApiError>>,
    delete_error: Mutex<Option<ApiError>>,
    /// Fail the n-th update call (0-based)
    update_failure: Mutex<Option<(usize, ApiError)>>,
    /// Cancel the token while answering the n-th get (1-based)
    cancel_on_get: Mutex<Option<(usize, CancellationToken)>>,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl<K: ResourceKind> FakeApi<K> {
    pub fn new(next_handle: Handle) -> Arc<Self> {
        Arc::new(Self {
            next_handle,
            scripts: Mutex::new(HashMap::new()),
            create_error: Mutex::new(None),
            delete_error: Mutex::new(None),
            update_failure: Mutex::new(None),
            cancel_on_get: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn script(&self, handle: &Handle, responses: Vec<Result<K::Detail, ApiError>>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(handle.to_string(), responses.into());
    }

    pub fn script_details(&self, handle: &Handle, details: Vec<K::Detail>) {
        self.script(handle, details.into_iter().map(Ok).collect());
    }

    pub fn fail_create(&self, error: ApiError) {
        *self.create_error.lock().unwrap() = Some(error);
    }

    pub fn fail_delete(&self, error: ApiError) {
        *self.delete_error.lock().unwrap() = Some(error);
    }

    pub fn fail_update(&self, nth: usize, error: ApiError) {
        *self.update_failure.lock().unwrap() = Some((nth, error));
    }

    pub fn cancel_on_get(&self, nth: usize, cancel: CancellationToken) {
        *self.cancel_on_get.lock().unwrap() = Some((nth, cancel));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    pub fn gets(&self) -> usize {
        self.count(|c| matches!(c, Call::Get(_)))
    }

    /// Update calls in the order they were issued
    pub fn updates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update(_, delta) => Some(delta),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl<K: ResourceKind> ResourceApi<K> for FakeApi<K> {
    async fn create(&self, _spec: &K::Spec) -> Result<Handle, ApiError> {
        self.record(Call::Create);
        match self.create_error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(self.next_handle.clone()),
        }
    }

    async fn get(&self, handle: &Handle) -> Result<K::Detail, ApiError> {
        self.record(Call::Get(handle.to_string()));
        if let Some((nth, cancel)) = self.cancel_on_get.lock().unwrap().as_ref() {
            if *nth == self.gets() {
                cancel.cancel();
            }
        }
        let mut scripts = self.scripts.lock().unwrap();
        let Some(queue) = scripts.get_mut(&handle.to_string()) else {
            return Err(ApiError::not_found(format!("{} not found", handle)));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ApiError::not_found(format!("{} not found", handle))))
        }
    }

    async fn update(&self, handle: &Handle, delta: &K::Delta) -> Result<(), ApiError> {
        let nth = self.count(|c| matches!(c, Call::Update(..)));
        self.record(Call::Update(handle.to_string(), format!("{:?}", delta)));
        let mut failure = self.update_failure.lock().unwrap();
        match failure.take() {
            Some((at, error)) if at == nth => Err(error),
            other => {
                *failure = other;
                Ok(())
            }
        }
    }

    async fn delete(&self, handle: &Handle) -> Result<(), ApiError> {
        self.record(Call::Delete(handle.to_string()));
        match self.delete_error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Build a detail from JSON
#[allow(dead_code)]
pub fn detail<K>(value: serde_json::Value) -> K::Detail
where
    K: ResourceKind<Detail: DeserializeOwned>,
{
    serde_json::from_value(value).unwrap()
}
