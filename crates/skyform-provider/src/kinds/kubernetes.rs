//! Managed Kubernetes clusters and their node groups

use super::{immutable, require_name};
use serde::{Deserialize, Serialize};
use serde_json::json;
use skyform_api::{RestCall, RestKind};
use skyform_cloud::{
    CloudError, ErrorMarker, Handle, ResourceKind, ResourceState, Result, StatusAlphabet, Timings,
};
use std::collections::BTreeMap;

const CLUSTER_STATUSES: &[&str] = &[
    "CREATING",
    "ACTIVE",
    "UPGRADING",
    "UPDATING",
    "DELETING",
    "ERROR",
    "CREATE_ERROR",
    "UPGRADE_ERROR",
    "UPDATE_ERROR",
    "DELETE_ERROR",
];

const NODEGROUP_STATUSES: &[&str] = &[
    "CREATING",
    "ACTIVE",
    "SCALING",
    "UPDATING",
    "DELETING",
    "ERROR",
    "CREATE_ERROR",
    "SCALE_ERROR",
    "UPDATE_ERROR",
    "DELETE_ERROR",
];

/// `1.29.3` → `[1, 29, 3]`; a leading `v` is accepted
fn parse_version(version: &str) -> Option<Vec<u32>> {
    let version = version.strip_prefix('v').unwrap_or(version);
    version.split('.').map(|part| part.parse().ok()).collect()
}

pub struct KubernetesCluster;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub region: Option<String>,
    /// e.g. `sun:03:00`
    #[serde(default)]
    pub maintenance_window: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDetail {
    pub id: String,
    pub name: String,
    pub status: String,
    pub version: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub maintenance_window: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClusterDelta {
    Upgrade { version: String },
    MaintenanceWindow(Option<String>),
}

impl ResourceKind for KubernetesCluster {
    const TYPE_NAME: &'static str = "skyform_kubernetes_cluster";
    const ALPHABET: StatusAlphabet =
        StatusAlphabet::new(CLUSTER_STATUSES, ErrorMarker::Suffix("ERROR"));
    const TIMINGS: Timings = Timings::minutes(100, 60, 60, 60);
    const ACTIVE: &'static str = "ACTIVE";
    const DELETING: &'static [&'static str] = &["DELETING"];

    type Spec = ClusterSpec;
    type Detail = ClusterDetail;
    type Delta = ClusterDelta;

    fn validate(spec: &ClusterSpec) -> Result<()> {
        require_name(Self::TYPE_NAME, &spec.name)?;
        if parse_version(&spec.version).is_none() {
            return Err(CloudError::validation(
                Self::TYPE_NAME,
                format!("unparseable Kubernetes version {:?}", spec.version),
            ));
        }
        Ok(())
    }

    fn status(detail: &ClusterDetail) -> &str {
        &detail.status
    }

    fn plan_update(current: &ClusterDetail, desired: &ClusterSpec) -> Result<Vec<ClusterDelta>> {
        immutable(Self::TYPE_NAME, "name", &current.name, &desired.name)?;
        if desired.region.is_some() {
            immutable(Self::TYPE_NAME, "region", &current.region, &desired.region)?;
        }

        let mut deltas = Vec::new();
        if current.version != desired.version {
            match (parse_version(&current.version), parse_version(&desired.version)) {
                (Some(from), Some(to)) if to < from => {
                    return Err(CloudError::validation(
                        Self::TYPE_NAME,
                        format!(
                            "cannot downgrade from {} to {}",
                            current.version, desired.version
                        ),
                    ));
                }
                _ => deltas.push(ClusterDelta::Upgrade {
                    version: desired.version.clone(),
                }),
            }
        }
        if current.maintenance_window != desired.maintenance_window {
            deltas.push(ClusterDelta::MaintenanceWindow(
                desired.maintenance_window.clone(),
            ));
        }
        Ok(deltas)
    }

    fn to_state(handle: &Handle, detail: &ClusterDetail) -> ResourceState {
        ResourceState::new(handle.to_string(), Self::TYPE_NAME)
            .with_status(detail.status.clone())
            .with_attribute("name", json!(detail.name))
            .with_attribute("version", json!(detail.version))
            .with_attribute("region", json!(detail.region))
            .with_attribute("maintenance_window", json!(detail.maintenance_window))
    }
}

impl RestKind for KubernetesCluster {
    const ENVELOPE: &'static str = "cluster";

    fn collection(_parent: Option<&str>) -> String {
        "/kubernetes/clusters".to_string()
    }

    fn create_body(spec: &ClusterSpec) -> serde_json::Value {
        json!({
            "name": spec.name,
            "version": spec.version,
            "region": spec.region,
            "maintenance_window": spec.maintenance_window,
        })
    }

    fn update_call(delta: &ClusterDelta) -> RestCall {
        match delta {
            ClusterDelta::Upgrade { version } => {
                RestCall::action("upgrade", json!({ "version": version }))
            }
            ClusterDelta::MaintenanceWindow(window) => {
                RestCall::patch(json!({ "cluster": { "maintenance_window": window } }))
            }
        }
    }
}

/// Worker node group, addressed as `cluster_id,nodegroup_id`
pub struct KubernetesNodeGroup;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroupSpec {
    pub cluster_id: String,
    pub name: String,
    pub flavor_id: String,
    pub node_count: u32,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroupDetail {
    pub id: String,
    pub cluster_id: String,
    pub name: String,
    pub status: String,
    pub flavor_id: String,
    pub node_count: u32,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeGroupDelta {
    Scale { node_count: u32 },
    Labels(BTreeMap<String, String>),
}

impl ResourceKind for KubernetesNodeGroup {
    const TYPE_NAME: &'static str = "skyform_kubernetes_nodegroup";
    const ALPHABET: StatusAlphabet =
        StatusAlphabet::new(NODEGROUP_STATUSES, ErrorMarker::Suffix("ERROR"));
    const TIMINGS: Timings = Timings::minutes(60, 60, 30, 30);
    const ACTIVE: &'static str = "ACTIVE";
    const DELETING: &'static [&'static str] = &["DELETING"];
    const COMPOSITE_HANDLE: bool = true;

    type Spec = NodeGroupSpec;
    type Detail = NodeGroupDetail;
    type Delta = NodeGroupDelta;

    fn validate(spec: &NodeGroupSpec) -> Result<()> {
        require_name(Self::TYPE_NAME, &spec.name)?;
        if spec.cluster_id.is_empty() {
            return Err(CloudError::validation(Self::TYPE_NAME, "cluster_id is required"));
        }
        if spec.node_count == 0 {
            return Err(CloudError::validation(
                Self::TYPE_NAME,
                "node_count must be at least 1",
            ));
        }
        Ok(())
    }

    fn status(detail: &NodeGroupDetail) -> &str {
        &detail.status
    }

    fn plan_update(current: &NodeGroupDetail, desired: &NodeGroupSpec) -> Result<Vec<NodeGroupDelta>> {
        immutable(Self::TYPE_NAME, "cluster_id", &current.cluster_id, &desired.cluster_id)?;
        immutable(Self::TYPE_NAME, "name", &current.name, &desired.name)?;
        immutable(Self::TYPE_NAME, "flavor_id", &current.flavor_id, &desired.flavor_id)?;

        let mut deltas = Vec::new();
        if current.node_count != desired.node_count {
            deltas.push(NodeGroupDelta::Scale {
                node_count: desired.node_count,
            });
        }
        if current.labels != desired.labels {
            deltas.push(NodeGroupDelta::Labels(desired.labels.clone()));
        }
        Ok(deltas)
    }

    fn to_state(handle: &Handle, detail: &NodeGroupDetail) -> ResourceState {
        ResourceState::new(handle.to_string(), Self::TYPE_NAME)
            .with_status(detail.status.clone())
            .with_attribute("cluster_id", json!(detail.cluster_id))
            .with_attribute("name", json!(detail.name))
            .with_attribute("flavor_id", json!(detail.flavor_id))
            .with_attribute("node_count", json!(detail.node_count))
            .with_attribute("labels", json!(detail.labels))
    }
}

impl RestKind for KubernetesNodeGroup {
    const ENVELOPE: &'static str = "nodegroup";

    fn collection(parent: Option<&str>) -> String {
        format!("/kubernetes/clusters/{}/nodegroups", parent.unwrap_or_default())
    }

    fn parent_of(spec: &NodeGroupSpec) -> Option<String> {
        Some(spec.cluster_id.clone())
    }

    fn create_body(spec: &NodeGroupSpec) -> serde_json::Value {
        json!({
            "name": spec.name,
            "flavor_id": spec.flavor_id,
            "node_count": spec.node_count,
            "labels": spec.labels,
        })
    }

    fn update_call(delta: &NodeGroupDelta) -> RestCall {
        match delta {
            NodeGroupDelta::Scale { node_count } => {
                RestCall::action("scale", json!({ "node_count": node_count }))
            }
            NodeGroupDelta::Labels(labels) => {
                RestCall::patch(json!({ "nodegroup": { "labels": labels } }))
            }
        }
    }
}
