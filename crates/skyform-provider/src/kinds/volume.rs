//! Block storage volumes

use super::{immutable, no_shrink, require_name};
use serde::{Deserialize, Serialize};
use serde_json::json;
use skyform_api::{RestCall, RestKind};
use skyform_cloud::{
    CloudError, ErrorMarker, Handle, ResourceKind, ResourceState, Result, StatusAlphabet, Timings,
};

pub struct Volume;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeSpec {
    pub name: String,
    pub size_gb: u32,
    #[serde(default)]
    pub volume_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeDetail {
    pub id: String,
    pub name: String,
    pub status: String,
    pub size_gb: u32,
    #[serde(default)]
    pub volume_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VolumeDelta {
    Extend { size_gb: u32 },
    Rename { name: String },
}

impl ResourceKind for Volume {
    const TYPE_NAME: &'static str = "skyform_volume";
    const ALPHABET: StatusAlphabet = StatusAlphabet::new(
        &[
            "creating",
            "available",
            "reserved",
            "attaching",
            "detaching",
            "in-use",
            "extending",
            "deleting",
            "error",
            "error_deleting",
            "error_extending",
        ],
        ErrorMarker::Prefix("error"),
    );
    const TIMINGS: Timings = Timings::minutes(30, 30, 30, 10);
    const ACTIVE: &'static str = "available";
    const SETTLED: &'static [&'static str] = &["in-use"];
    const DELETING: &'static [&'static str] = &["deleting"];

    type Spec = VolumeSpec;
    type Detail = VolumeDetail;
    type Delta = VolumeDelta;

    fn validate(spec: &VolumeSpec) -> Result<()> {
        require_name(Self::TYPE_NAME, &spec.name)?;
        if spec.size_gb == 0 {
            return Err(CloudError::validation(Self::TYPE_NAME, "size_gb must be at least 1"));
        }
        Ok(())
    }

    fn status(detail: &VolumeDetail) -> &str {
        &detail.status
    }

    fn plan_update(current: &VolumeDetail, desired: &VolumeSpec) -> Result<Vec<VolumeDelta>> {
        if desired.volume_type.is_some() {
            immutable(
                Self::TYPE_NAME,
                "volume_type",
                &current.volume_type,
                &desired.volume_type,
            )?;
        }
        no_shrink(Self::TYPE_NAME, "size_gb", current.size_gb, desired.size_gb)?;

        let mut deltas = Vec::new();
        if desired.size_gb > current.size_gb {
            deltas.push(VolumeDelta::Extend {
                size_gb: desired.size_gb,
            });
        }
        if current.name != desired.name {
            deltas.push(VolumeDelta::Rename {
                name: desired.name.clone(),
            });
        }
        Ok(deltas)
    }

    fn to_state(handle: &Handle, detail: &VolumeDetail) -> ResourceState {
        ResourceState::new(handle.to_string(), Self::TYPE_NAME)
            .with_status(detail.status.clone())
            .with_attribute("name", json!(detail.name))
            .with_attribute("size_gb", json!(detail.size_gb))
            .with_attribute("volume_type", json!(detail.volume_type))
    }
}

impl RestKind for Volume {
    const ENVELOPE: &'static str = "volume";

    fn collection(_parent: Option<&str>) -> String {
        "/volumes".to_string()
    }

    fn create_body(spec: &VolumeSpec) -> serde_json::Value {
        json!({
            "name": spec.name,
            "size_gb": spec.size_gb,
            "volume_type": spec.volume_type,
        })
    }

    fn update_call(delta: &VolumeDelta) -> RestCall {
        match delta {
            VolumeDelta::Extend { size_gb } => {
                RestCall::action("extend", json!({ "new_size_gb": size_gb }))
            }
            VolumeDelta::Rename { name } => RestCall::patch(json!({ "volume": { "name": name } })),
        }
    }
}
