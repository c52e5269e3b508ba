//! Floating IPs
//!
//! The settled status depends on the binding: `ACTIVE` when associated with
//! a port, `DOWN` otherwise.

use super::immutable;
use serde::{Deserialize, Serialize};
use serde_json::json;
use skyform_api::{RestCall, RestKind};
use skyform_cloud::{
    CloudError, ErrorMarker, Handle, ResourceKind, ResourceState, Result, StatusAlphabet, Timings,
};

const DOWN: &str = "DOWN";

pub struct FloatingIp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingIpSpec {
    pub network_id: String,
    #[serde(default)]
    pub port_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingIpDetail {
    pub id: String,
    pub status: String,
    pub network_id: String,
    #[serde(default)]
    pub floating_ip_address: Option<String>,
    #[serde(default)]
    pub port_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FloatingIpDelta {
    Associate { port_id: String },
    Disassociate,
}

impl ResourceKind for FloatingIp {
    const TYPE_NAME: &'static str = "skyform_floating_ip";
    const ALPHABET: StatusAlphabet =
        StatusAlphabet::new(&["ACTIVE", "DOWN", "ERROR"], ErrorMarker::Exact("ERROR"));
    const TIMINGS: Timings = Timings::minutes(5, 5, 5, 10);
    const ACTIVE: &'static str = "ACTIVE";

    type Spec = FloatingIpSpec;
    type Detail = FloatingIpDetail;
    type Delta = FloatingIpDelta;

    fn validate(spec: &FloatingIpSpec) -> Result<()> {
        if spec.network_id.is_empty() {
            return Err(CloudError::validation(Self::TYPE_NAME, "network_id is required"));
        }
        if spec.port_id.as_deref() == Some("") {
            return Err(CloudError::validation(
                Self::TYPE_NAME,
                "port_id must be omitted rather than empty",
            ));
        }
        Ok(())
    }

    fn status(detail: &FloatingIpDetail) -> &str {
        &detail.status
    }

    fn create_target(spec: &FloatingIpSpec) -> &'static str {
        if spec.port_id.is_some() {
            Self::ACTIVE
        } else {
            DOWN
        }
    }

    fn update_target(delta: &FloatingIpDelta, _current: &str) -> &'static str {
        match delta {
            FloatingIpDelta::Associate { .. } => Self::ACTIVE,
            FloatingIpDelta::Disassociate => DOWN,
        }
    }

    fn plan_update(current: &FloatingIpDetail, desired: &FloatingIpSpec) -> Result<Vec<FloatingIpDelta>> {
        immutable(Self::TYPE_NAME, "network_id", &current.network_id, &desired.network_id)?;

        if current.port_id == desired.port_id {
            return Ok(Vec::new());
        }
        Ok(vec![match &desired.port_id {
            Some(port_id) => FloatingIpDelta::Associate {
                port_id: port_id.clone(),
            },
            None => FloatingIpDelta::Disassociate,
        }])
    }

    fn to_state(handle: &Handle, detail: &FloatingIpDetail) -> ResourceState {
        ResourceState::new(handle.to_string(), Self::TYPE_NAME)
            .with_status(detail.status.clone())
            .with_attribute("network_id", json!(detail.network_id))
            .with_attribute("floating_ip_address", json!(detail.floating_ip_address))
            .with_attribute("port_id", json!(detail.port_id))
    }
}

impl RestKind for FloatingIp {
    const ENVELOPE: &'static str = "floatingip";

    fn collection(_parent: Option<&str>) -> String {
        "/floatingips".to_string()
    }

    fn create_body(spec: &FloatingIpSpec) -> serde_json::Value {
        json!({
            "network_id": spec.network_id,
            "port_id": spec.port_id,
        })
    }

    fn update_call(delta: &FloatingIpDelta) -> RestCall {
        let port_id = match delta {
            FloatingIpDelta::Associate { port_id } => Some(port_id.as_str()),
            FloatingIpDelta::Disassociate => None,
        };
        RestCall::patch(json!({ "floatingip": { "port_id": port_id } }))
    }
}
