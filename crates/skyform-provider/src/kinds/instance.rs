//! Compute instances

use super::{immutable, require_name};
use serde::{Deserialize, Serialize};
use serde_json::json;
use skyform_api::{RestCall, RestKind};
use skyform_cloud::{
    CloudError, ErrorMarker, Handle, ResourceKind, ResourceState, Result, StatusAlphabet, Timings,
};

pub struct Instance;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub name: String,
    pub flavor_id: String,
    pub image_id: String,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDetail {
    pub id: String,
    pub name: String,
    pub status: String,
    pub flavor_id: String,
    pub image_id: String,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstanceDelta {
    Resize { flavor_id: String },
    Rename { name: String },
}

impl ResourceKind for Instance {
    const TYPE_NAME: &'static str = "skyform_instance";
    const ALPHABET: StatusAlphabet = StatusAlphabet::new(
        &[
            "BUILD",
            "ACTIVE",
            "RESIZE",
            "VERIFY_RESIZE",
            "REBOOT",
            "SHUTOFF",
            "DELETING",
            "DELETED",
            "ERROR",
        ],
        ErrorMarker::Exact("ERROR"),
    );
    const TIMINGS: Timings = Timings::minutes(30, 30, 30, 10);
    const ACTIVE: &'static str = "ACTIVE";
    const SETTLED: &'static [&'static str] = &["SHUTOFF"];
    const DELETING: &'static [&'static str] = &["DELETING"];
    const DELETED: Option<&'static str> = Some("DELETED");

    type Spec = InstanceSpec;
    type Detail = InstanceDetail;
    type Delta = InstanceDelta;

    fn validate(spec: &InstanceSpec) -> Result<()> {
        require_name(Self::TYPE_NAME, &spec.name)?;
        if spec.flavor_id.is_empty() || spec.image_id.is_empty() {
            return Err(CloudError::validation(
                Self::TYPE_NAME,
                "flavor_id and image_id are required",
            ));
        }
        Ok(())
    }

    fn status(detail: &InstanceDetail) -> &str {
        &detail.status
    }

    fn plan_update(current: &InstanceDetail, desired: &InstanceSpec) -> Result<Vec<InstanceDelta>> {
        immutable(Self::TYPE_NAME, "image_id", &current.image_id, &desired.image_id)?;
        if desired.region.is_some() {
            immutable(Self::TYPE_NAME, "region", &current.region, &desired.region)?;
        }

        let mut deltas = Vec::new();
        if current.flavor_id != desired.flavor_id {
            deltas.push(InstanceDelta::Resize {
                flavor_id: desired.flavor_id.clone(),
            });
        }
        if current.name != desired.name {
            deltas.push(InstanceDelta::Rename {
                name: desired.name.clone(),
            });
        }
        Ok(deltas)
    }

    fn to_state(handle: &Handle, detail: &InstanceDetail) -> ResourceState {
        ResourceState::new(handle.to_string(), Self::TYPE_NAME)
            .with_status(detail.status.clone())
            .with_attribute("name", json!(detail.name))
            .with_attribute("flavor_id", json!(detail.flavor_id))
            .with_attribute("image_id", json!(detail.image_id))
            .with_attribute("region", json!(detail.region))
    }
}

impl RestKind for Instance {
    const ENVELOPE: &'static str = "instance";

    fn collection(_parent: Option<&str>) -> String {
        "/instances".to_string()
    }

    fn create_body(spec: &InstanceSpec) -> serde_json::Value {
        let mut body = json!({
            "name": spec.name,
            "flavor_id": spec.flavor_id,
            "image_id": spec.image_id,
        });
        if let Some(region) = &spec.region {
            body["region"] = json!(region);
        }
        body
    }

    fn update_call(delta: &InstanceDelta) -> RestCall {
        match delta {
            InstanceDelta::Resize { flavor_id } => {
                RestCall::action("resize", json!({ "flavor_id": flavor_id }))
            }
            InstanceDelta::Rename { name } => RestCall::patch(json!({ "instance": { "name": name } })),
        }
    }
}
