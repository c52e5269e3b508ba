//! Volume attachments
//!
//! Addressed as `instance_id,volume_id`. Every field forces replacement, so
//! an attachment has no in-place updates.

use super::immutable;
use serde::{Deserialize, Serialize};
use serde_json::json;
use skyform_api::{RestCall, RestKind};
use skyform_cloud::{
    CloudError, ErrorMarker, Handle, ResourceKind, ResourceState, Result, StatusAlphabet, Timings,
};

pub struct VolumeAttachment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentSpec {
    pub instance_id: String,
    pub volume_id: String,
    #[serde(default)]
    pub device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentDetail {
    pub volume_id: String,
    pub instance_id: String,
    pub status: String,
    #[serde(default)]
    pub device: Option<String>,
}

/// Attachments cannot be changed in place
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentDelta {}

impl ResourceKind for VolumeAttachment {
    const TYPE_NAME: &'static str = "skyform_volume_attachment";
    const ALPHABET: StatusAlphabet = StatusAlphabet::new(
        &["attaching", "attached", "detaching", "attach_error", "detach_error"],
        ErrorMarker::Suffix("_error"),
    );
    const TIMINGS: Timings = Timings::minutes(5, 5, 5, 10);
    const ACTIVE: &'static str = "attached";
    const DELETING: &'static [&'static str] = &["detaching"];
    const COMPOSITE_HANDLE: bool = true;

    type Spec = AttachmentSpec;
    type Detail = AttachmentDetail;
    type Delta = AttachmentDelta;

    fn validate(spec: &AttachmentSpec) -> Result<()> {
        if spec.instance_id.is_empty() || spec.volume_id.is_empty() {
            return Err(CloudError::validation(
                Self::TYPE_NAME,
                "instance_id and volume_id are required",
            ));
        }
        Ok(())
    }

    fn status(detail: &AttachmentDetail) -> &str {
        &detail.status
    }

    fn plan_update(current: &AttachmentDetail, desired: &AttachmentSpec) -> Result<Vec<AttachmentDelta>> {
        immutable(Self::TYPE_NAME, "instance_id", &current.instance_id, &desired.instance_id)?;
        immutable(Self::TYPE_NAME, "volume_id", &current.volume_id, &desired.volume_id)?;
        if desired.device.is_some() {
            immutable(Self::TYPE_NAME, "device", &current.device, &desired.device)?;
        }
        Ok(Vec::new())
    }

    fn to_state(handle: &Handle, detail: &AttachmentDetail) -> ResourceState {
        ResourceState::new(handle.to_string(), Self::TYPE_NAME)
            .with_status(detail.status.clone())
            .with_attribute("instance_id", json!(detail.instance_id))
            .with_attribute("volume_id", json!(detail.volume_id))
            .with_attribute("device", json!(detail.device))
    }
}

impl RestKind for VolumeAttachment {
    const ENVELOPE: &'static str = "volume_attachment";
    const ID_FIELD: &'static str = "volume_id";

    fn collection(parent: Option<&str>) -> String {
        format!("/instances/{}/volume_attachments", parent.unwrap_or_default())
    }

    fn parent_of(spec: &AttachmentSpec) -> Option<String> {
        Some(spec.instance_id.clone())
    }

    fn create_body(spec: &AttachmentSpec) -> serde_json::Value {
        json!({
            "volume_id": spec.volume_id,
            "device": spec.device,
        })
    }

    fn update_call(delta: &AttachmentDelta) -> RestCall {
        match *delta {}
    }
}
