//! Cloud API client
//!
//! Thin JSON-over-HTTP layer with bearer token authentication. Non-2xx
//! answers become [`ApiError::Status`] carrying the backend message verbatim.

use serde::Serialize;
use serde::de::DeserializeOwned;
use skyform_cloud::ApiError;
use std::time::Duration;

/// HTTP verb of a mutating call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Post,
    Put,
    Patch,
}

/// Connection settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub token: String,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Cloud API client
pub struct CloudClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl CloudClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("skyform/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// GET `path` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        tracing::debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;

        decode(check(response).await?).await
    }

    /// POST a JSON body and decode the JSON answer
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        tracing::debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        decode(check(response).await?).await
    }

    /// Send a JSON body, ignoring the answer body
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        verb: Verb,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        tracing::debug!("{:?} {}", verb, path);
        let url = self.url(path);
        let request = match verb {
            Verb::Post => self.client.post(url),
            Verb::Put => self.client.put(url),
            Verb::Patch => self.client.patch(url),
        };
        let response = request
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        check(response).await?;
        Ok(())
    }

    /// DELETE `path`
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        tracing::debug!("DELETE {}", path);
        let response = self
            .client
            .delete(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;

        check(response).await?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(transport)?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Turn non-2xx answers into `ApiError::Status`
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(ApiError::status(status.as_u16(), error_message(&text)))
}

/// Extract the message of an error body
///
/// Handles `{"error": {"message": ...}}`, `{"error": "..."}` and
/// `{"message": ...}`; anything else is returned as-is.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    let message = value
        .pointer("/error/message")
        .or_else(|| value.get("error"))
        .or_else(|| value.get("message"))
        .and_then(|v| v.as_str());

    match message {
        Some(m) => m.to_string(),
        None => body.trim().to_string(),
    }
}
