mod common;

use common::{Call, FakeApi, detail};
use serde_json::json;
use skyform_cloud::{
    ApiError, CancellationToken, Handle, Provider, ResourceApi, ResourceState, Severity,
    TimingOverrides,
};
use skyform_config::PollingConfig;
use skyform_provider::volume::VolumeDetail;
use skyform_provider::{Volume, reconciler_for};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn volume(status: &str, name: &str) -> VolumeDetail {
    detail::<Volume>(json!({
        "id": "vol-1",
        "name": name,
        "status": status,
        "size_gb": 20,
    }))
}

fn provider_with(fake: &Arc<FakeApi<Volume>>, polling: &PollingConfig) -> Provider {
    let api: Arc<dyn ResourceApi<Volume>> = fake.clone();
    Provider::new().with_resource(Arc::new(reconciler_for(api, polling)))
}

fn provider(fake: &Arc<FakeApi<Volume>>) -> Provider {
    provider_with(fake, &PollingConfig::default())
}

fn planned(name: &str) -> serde_json::Value {
    json!({ "name": name, "size_gb": 20 })
}

#[tokio::test(start_paused = true)]
async fn test_full_lifecycle() {
    let handle = Handle::new("vol-1");
    let fake = FakeApi::<Volume>::new(handle.clone());
    fake.script_details(&handle, vec![volume("creating", "data"), volume("available", "data")]);
    let provider = provider(&fake);
    let cancel = CancellationToken::new();

    let created = provider.create(&cancel, "skyform_volume", &planned("data")).await;
    assert!(created.diagnostics.is_empty());
    let state = created.state.unwrap();
    assert_eq!(state.resource_type, "skyform_volume");

    let read = provider.read(&cancel, &state).await;
    assert_eq!(read.state.as_ref(), Some(&state));

    fake.script_details(
        &handle,
        vec![volume("available", "data"), volume("available", "logs")],
    );
    let updated = provider.update(&cancel, &state, &planned("logs")).await;
    assert!(!updated.has_errors());
    assert_eq!(
        updated.state.unwrap().get_attribute::<String>("name").unwrap(),
        "logs"
    );

    fake.script(
        &handle,
        vec![Ok(volume("available", "logs")), Err(ApiError::not_found("gone"))],
    );
    let deleted = provider.delete(&cancel, &state).await;
    assert!(deleted.diagnostics.is_empty());
    assert!(deleted.state.is_none());
}

#[tokio::test]
async fn test_malformed_plan_is_a_validation_diagnostic() {
    let fake = FakeApi::<Volume>::new(Handle::new("vol-1"));
    let response = provider(&fake)
        .create(&CancellationToken::new(), "skyform_volume", &json!({ "name": "data" }))
        .await;

    assert!(response.state.is_none());
    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].summary, "Invalid skyform_volume configuration");
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_type() {
    let fake = FakeApi::<Volume>::new(Handle::new("vol-1"));
    let response = provider(&fake)
        .create(&CancellationToken::new(), "skyform_bucket", &json!({}))
        .await;

    assert!(response.has_errors());
    assert_eq!(response.diagnostics[0].summary, "Unknown resource type");
    assert!(response.diagnostics[0].detail.contains("skyform_bucket"));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_diagnostic_keeps_partial_state() {
    let handle = Handle::new("vol-1");
    let fake = FakeApi::<Volume>::new(handle.clone());
    fake.script_details(&handle, vec![volume("creating", "data")]);

    let mut polling = PollingConfig::default();
    polling.kinds.insert(
        "skyform_volume".to_string(),
        TimingOverrides {
            create_timeout_secs: Some(60),
            ..Default::default()
        },
    );
    let started = Instant::now();
    let response = provider_with(&fake, &polling)
        .create(&CancellationToken::new(), "skyform_volume", &planned("data"))
        .await;

    let diagnostic = &response.diagnostics[0];
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.summary, "Timed out waiting for skyform_volume during create");
    assert!(diagnostic.detail.contains("vol-1"));
    assert!(diagnostic.detail.contains("available"));

    let state = response.state.unwrap();
    assert_eq!(state.id, "vol-1");
    assert_eq!(state.status, "creating");

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn test_remote_error_diagnostic_carries_backend_status() {
    let handle = Handle::new("vol-1");
    let fake = FakeApi::<Volume>::new(handle.clone());
    fake.script_details(&handle, vec![volume("error", "data")]);

    let response = provider(&fake)
        .create(&CancellationToken::new(), "skyform_volume", &planned("data"))
        .await;

    let diagnostic = &response.diagnostics[0];
    assert_eq!(diagnostic.summary, "skyform_volume entered an error state during create");
    assert!(diagnostic.detail.contains("\"error\""));
    assert_eq!(response.state.unwrap().status, "error");
}

#[tokio::test]
async fn test_read_of_vanished_resource_clears_state() {
    let fake = FakeApi::<Volume>::new(Handle::new("vol-1"));
    let state = ResourceState::new("vol-1", "skyform_volume");

    let response = provider(&fake).read(&CancellationToken::new(), &state).await;

    assert!(response.state.is_none());
    assert!(response.diagnostics.is_empty());
}

#[tokio::test]
async fn test_read_failure_keeps_prior_state() {
    let handle = Handle::new("vol-1");
    let fake = FakeApi::<Volume>::new(handle.clone());
    fake.script(&handle, vec![Err(ApiError::status(503, "maintenance"))]);
    let state = ResourceState::new("vol-1", "skyform_volume");

    let response = provider(&fake).read(&CancellationToken::new(), &state).await;

    assert_eq!(response.state, Some(state));
    assert!(response.diagnostics[0].detail.contains("maintenance"));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_update_keeps_prior_state() {
    let handle = Handle::new("vol-1");
    let fake = FakeApi::<Volume>::new(handle.clone());
    fake.script_details(&handle, vec![volume("available", "data")]);
    let prior = ResourceState::new("vol-1", "skyform_volume").with_status("available");

    let response = provider(&fake)
        .update(
            &CancellationToken::new(),
            &prior,
            &json!({ "name": "data", "size_gb": 5 }),
        )
        .await;

    assert_eq!(response.state, Some(prior));
    assert_eq!(response.diagnostics[0].summary, "Invalid skyform_volume configuration");
    assert!(fake.updates().is_empty());
}

#[tokio::test]
async fn test_import_and_data_source() {
    let handle = Handle::new("vol-1");
    let fake = FakeApi::<Volume>::new(handle.clone());
    fake.script_details(&handle, vec![volume("in-use", "data")]);
    let provider = provider(&fake);
    let cancel = CancellationToken::new();

    let imported = provider.import(&cancel, "skyform_volume", "vol-1").await;
    let looked_up = provider.read_data_source(&cancel, "skyform_volume", "vol-1").await;

    assert_eq!(imported.state.as_ref().unwrap().status, "in-use");
    assert_eq!(imported, looked_up);
    assert_eq!(fake.gets(), 2);
}

#[tokio::test]
async fn test_import_of_missing_object() {
    let fake = FakeApi::<Volume>::new(Handle::new("vol-1"));
    let response = provider(&fake)
        .import(&CancellationToken::new(), "skyform_volume", "vol-404")
        .await;

    assert!(response.state.is_none());
    assert!(response.diagnostics[0].detail.contains("vol-404"));
    assert_eq!(fake.calls(), vec![Call::Get("vol-404".to_string())]);
}
