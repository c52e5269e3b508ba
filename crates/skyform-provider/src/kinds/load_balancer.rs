//! Load balancers

use super::{immutable, require_name};
use serde::{Deserialize, Serialize};
use serde_json::json;
use skyform_api::{RestCall, RestKind};
use skyform_cloud::{ErrorMarker, Handle, ResourceKind, ResourceState, Result, StatusAlphabet, Timings};

pub struct LoadBalancer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerSpec {
    pub name: String,
    pub flavor_id: String,
    pub network_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerDetail {
    pub id: String,
    pub name: String,
    pub status: String,
    pub flavor_id: String,
    pub network_id: String,
    #[serde(default)]
    pub vip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadBalancerDelta {
    Flavor { flavor_id: String },
    Rename { name: String },
}

impl ResourceKind for LoadBalancer {
    const TYPE_NAME: &'static str = "skyform_load_balancer";
    const ALPHABET: StatusAlphabet = StatusAlphabet::new(
        &[
            "PENDING_CREATE",
            "ACTIVE",
            "PENDING_UPDATE",
            "PENDING_DELETE",
            "DELETED",
            "ERROR",
            "ACTIVE_WITH_ERRORS",
        ],
        ErrorMarker::ContainsIgnoreCase("error"),
    );
    const TIMINGS: Timings = Timings::minutes(20, 20, 20, 10);
    const ACTIVE: &'static str = "ACTIVE";
    const DELETING: &'static [&'static str] = &["PENDING_DELETE"];
    const DELETED: Option<&'static str> = Some("DELETED");

    type Spec = LoadBalancerSpec;
    type Detail = LoadBalancerDetail;
    type Delta = LoadBalancerDelta;

    fn validate(spec: &LoadBalancerSpec) -> Result<()> {
        require_name(Self::TYPE_NAME, &spec.name)
    }

    fn status(detail: &LoadBalancerDetail) -> &str {
        &detail.status
    }

    fn plan_update(
        current: &LoadBalancerDetail,
        desired: &LoadBalancerSpec,
    ) -> Result<Vec<LoadBalancerDelta>> {
        immutable(Self::TYPE_NAME, "network_id", &current.network_id, &desired.network_id)?;

        let mut deltas = Vec::new();
        if current.flavor_id != desired.flavor_id {
            deltas.push(LoadBalancerDelta::Flavor {
                flavor_id: desired.flavor_id.clone(),
            });
        }
        if current.name != desired.name {
            deltas.push(LoadBalancerDelta::Rename {
                name: desired.name.clone(),
            });
        }
        Ok(deltas)
    }

    fn to_state(handle: &Handle, detail: &LoadBalancerDetail) -> ResourceState {
        ResourceState::new(handle.to_string(), Self::TYPE_NAME)
            .with_status(detail.status.clone())
            .with_attribute("name", json!(detail.name))
            .with_attribute("flavor_id", json!(detail.flavor_id))
            .with_attribute("network_id", json!(detail.network_id))
            .with_attribute("vip_address", json!(detail.vip_address))
    }
}

impl RestKind for LoadBalancer {
    const ENVELOPE: &'static str = "loadbalancer";

    fn collection(_parent: Option<&str>) -> String {
        "/loadbalancers".to_string()
    }

    fn create_body(spec: &LoadBalancerSpec) -> serde_json::Value {
        json!({
            "name": spec.name,
            "flavor_id": spec.flavor_id,
            "network_id": spec.network_id,
        })
    }

    fn update_call(delta: &LoadBalancerDelta) -> RestCall {
        match delta {
            LoadBalancerDelta::Flavor { flavor_id } => {
                RestCall::patch(json!({ "loadbalancer": { "flavor_id": flavor_id } }))
            }
            LoadBalancerDelta::Rename { name } => {
                RestCall::patch(json!({ "loadbalancer": { "name": name } }))
            }
        }
    }
}
