//! Skyform provider
//!
//! Resource kinds for the Skyform cloud and the entry points that assemble
//! them into a [`Provider`] the orchestrator can drive.
//!
//! # Example
//!
//! ```ignore
//! use skyform_provider::{configure_from_env, init_tracing};
//! use skyform_cloud::CancellationToken;
//!
//! init_tracing()?;
//! let provider = configure_from_env()?;
//!
//! let cancel = CancellationToken::new();
//! let response = provider
//!     .create(&cancel, "skyform_volume", &serde_json::json!({"name": "data", "size_gb": 20}))
//!     .await;
//! ```

pub mod kinds;

pub use kinds::*;

use skyform_api::{ClientConfig, CloudClient, RestKind, RestResource};
use skyform_cloud::{PollPolicy, Provider, Reconciler, ResourceApi, ResourceKind};
use skyform_config::{PollingConfig, ProviderConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "skyform=info";

/// Reconciler for `K` with the configured timing overrides applied
pub fn reconciler_for<K: ResourceKind>(
    api: Arc<dyn ResourceApi<K>>,
    polling: &PollingConfig,
) -> Reconciler<K> {
    let timings = K::TIMINGS.with_overrides(&polling.overrides_for(K::TYPE_NAME));
    let policy = PollPolicy::new(timings).with_transient_retry(polling.transient_retry.clone());
    Reconciler::new(api).with_policy(policy)
}

fn register<K: RestKind>(provider: &mut Provider, client: &Arc<CloudClient>, polling: &PollingConfig) {
    let api: Arc<dyn ResourceApi<K>> = Arc::new(RestResource::<K>::new(client.clone()));
    provider.register(Arc::new(reconciler_for(api, polling)));
}

/// Register every resource kind against `client`
pub fn provider_with_client(client: Arc<CloudClient>, polling: &PollingConfig) -> Provider {
    let mut provider = Provider::new();
    register::<Instance>(&mut provider, &client, polling);
    register::<Volume>(&mut provider, &client, polling);
    register::<VolumeAttachment>(&mut provider, &client, polling);
    register::<KubernetesCluster>(&mut provider, &client, polling);
    register::<KubernetesNodeGroup>(&mut provider, &client, polling);
    register::<DbaasCluster>(&mut provider, &client, polling);
    register::<LoadBalancer>(&mut provider, &client, polling);
    register::<FloatingIp>(&mut provider, &client, polling);
    provider
}

/// Build the provider from an already resolved configuration
pub fn configure(config: &ProviderConfig) -> anyhow::Result<Provider> {
    config.validate()?;

    let mut client_config = ClientConfig::new(config.endpoint()?, config.token()?);
    client_config.request_timeout = config.request_timeout();
    let client = CloudClient::new(client_config)?;

    tracing::info!(
        endpoint = client.endpoint(),
        region = config.region.as_deref().unwrap_or("default"),
        "provider configured"
    );
    Ok(provider_with_client(Arc::new(client), &config.polling))
}

/// Discover the configuration file, apply environment overrides and build
/// the provider
pub fn configure_from_env() -> anyhow::Result<Provider> {
    let config = ProviderConfig::resolve()?;
    configure(&config)
}

/// Install the global tracing subscriber
///
/// Logs go to stderr; stdout belongs to the orchestrator.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))
}
