//! Database-as-a-service clusters
//!
//! Parameter changes are applied asynchronously after the cluster reports
//! `ACTIVE`; the cluster only counts as ready once
//! `apply_parameters_pending` is cleared.

use super::{immutable, no_shrink, require_name};
use serde::{Deserialize, Serialize};
use serde_json::json;
use skyform_api::{RestCall, RestKind, Verb};
use skyform_cloud::{
    CloudError, ErrorMarker, Handle, ResourceKind, ResourceState, Result, StatusAlphabet, Timings,
};
use std::collections::BTreeMap;

/// Supported engines and their major versions
const ENGINES: &[(&str, &[&str])] = &[
    ("postgresql", &["13", "14", "15", "16"]),
    ("mysql", &["5.7", "8.0"]),
    ("redis", &["6", "7"]),
];

fn check_engine(engine: &str, version: &str) -> Result<()> {
    let Some((_, versions)) = ENGINES.iter().find(|(name, _)| *name == engine) else {
        let known: Vec<&str> = ENGINES.iter().map(|(name, _)| *name).collect();
        return Err(CloudError::validation(
            DbaasCluster::TYPE_NAME,
            format!("unknown engine {:?}, expected one of {}", engine, known.join(", ")),
        ));
    };
    if !versions.contains(&version) {
        return Err(CloudError::validation(
            DbaasCluster::TYPE_NAME,
            format!(
                "{} does not support version {:?} (supported: {})",
                engine,
                version,
                versions.join(", ")
            ),
        ));
    }
    Ok(())
}

pub struct DbaasCluster;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbaasSpec {
    pub name: String,
    pub engine: String,
    pub engine_version: String,
    pub flavor_id: String,
    pub volume_size_gb: u32,
    /// Daily backup start time, e.g. `02:30`
    #[serde(default)]
    pub backup_schedule: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbaasDetail {
    pub id: String,
    pub name: String,
    pub status: String,
    pub engine: String,
    pub engine_version: String,
    pub flavor_id: String,
    pub volume_size_gb: u32,
    #[serde(default)]
    pub backup_schedule: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub apply_parameters_pending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DbaasDelta {
    Flavor { flavor_id: String },
    Volume { size_gb: u32 },
    BackupSchedule(Option<String>),
    Parameters(BTreeMap<String, String>),
}

impl ResourceKind for DbaasCluster {
    const TYPE_NAME: &'static str = "skyform_dbaas_cluster";
    const ALPHABET: StatusAlphabet = StatusAlphabet::new(
        &[
            "CREATING",
            "ACTIVE",
            "RESIZING",
            "UPDATING",
            "BACKUP",
            "RESTARTING",
            "DELETING",
            "DELETED",
            "ERROR",
            "ERROR_RESIZE",
            "ERROR_UPDATE",
        ],
        ErrorMarker::Prefix("ERROR"),
    );
    const TIMINGS: Timings = Timings::minutes(60, 60, 30, 30);
    const ACTIVE: &'static str = "ACTIVE";
    const DELETING: &'static [&'static str] = &["DELETING"];
    const DELETED: Option<&'static str> = Some("DELETED");

    type Spec = DbaasSpec;
    type Detail = DbaasDetail;
    type Delta = DbaasDelta;

    fn validate(spec: &DbaasSpec) -> Result<()> {
        require_name(Self::TYPE_NAME, &spec.name)?;
        check_engine(&spec.engine, &spec.engine_version)?;
        if spec.volume_size_gb == 0 {
            return Err(CloudError::validation(
                Self::TYPE_NAME,
                "volume_size_gb must be at least 1",
            ));
        }
        Ok(())
    }

    fn status(detail: &DbaasDetail) -> &str {
        &detail.status
    }

    fn ready(detail: &DbaasDetail) -> bool {
        !detail.apply_parameters_pending
    }

    fn plan_update(current: &DbaasDetail, desired: &DbaasSpec) -> Result<Vec<DbaasDelta>> {
        immutable(Self::TYPE_NAME, "name", &current.name, &desired.name)?;
        immutable(Self::TYPE_NAME, "engine", &current.engine, &desired.engine)?;
        immutable(
            Self::TYPE_NAME,
            "engine_version",
            &current.engine_version,
            &desired.engine_version,
        )?;
        no_shrink(
            Self::TYPE_NAME,
            "volume_size_gb",
            current.volume_size_gb,
            desired.volume_size_gb,
        )?;

        let mut deltas = Vec::new();
        if current.flavor_id != desired.flavor_id {
            deltas.push(DbaasDelta::Flavor {
                flavor_id: desired.flavor_id.clone(),
            });
        }
        if desired.volume_size_gb > current.volume_size_gb {
            deltas.push(DbaasDelta::Volume {
                size_gb: desired.volume_size_gb,
            });
        }
        if current.backup_schedule != desired.backup_schedule {
            deltas.push(DbaasDelta::BackupSchedule(desired.backup_schedule.clone()));
        }
        if current.parameters != desired.parameters {
            deltas.push(DbaasDelta::Parameters(desired.parameters.clone()));
        }
        Ok(deltas)
    }

    fn to_state(handle: &Handle, detail: &DbaasDetail) -> ResourceState {
        ResourceState::new(handle.to_string(), Self::TYPE_NAME)
            .with_status(detail.status.clone())
            .with_attribute("name", json!(detail.name))
            .with_attribute("engine", json!(detail.engine))
            .with_attribute("engine_version", json!(detail.engine_version))
            .with_attribute("flavor_id", json!(detail.flavor_id))
            .with_attribute("volume_size_gb", json!(detail.volume_size_gb))
            .with_attribute("backup_schedule", json!(detail.backup_schedule))
            .with_attribute("parameters", json!(detail.parameters))
    }
}

impl RestKind for DbaasCluster {
    const ENVELOPE: &'static str = "cluster";

    fn collection(_parent: Option<&str>) -> String {
        "/dbaas/clusters".to_string()
    }

    fn create_body(spec: &DbaasSpec) -> serde_json::Value {
        json!({
            "name": spec.name,
            "engine": spec.engine,
            "engine_version": spec.engine_version,
            "flavor_id": spec.flavor_id,
            "volume_size_gb": spec.volume_size_gb,
            "backup_schedule": spec.backup_schedule,
            "parameters": spec.parameters,
        })
    }

    fn update_call(delta: &DbaasDelta) -> RestCall {
        match delta {
            DbaasDelta::Flavor { flavor_id } => {
                RestCall::action("resize", json!({ "flavor_id": flavor_id }))
            }
            DbaasDelta::Volume { size_gb } => {
                RestCall::action("resize_volume", json!({ "volume_size_gb": size_gb }))
            }
            DbaasDelta::BackupSchedule(schedule) => {
                RestCall::patch(json!({ "cluster": { "backup_schedule": schedule } }))
            }
            DbaasDelta::Parameters(parameters) => RestCall {
                verb: Verb::Put,
                action: Some("parameters"),
                body: json!({ "parameters": parameters }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyform_cloud::{Classify, StatusClass};

    fn spec() -> DbaasSpec {
        DbaasSpec {
            name: "orders".to_string(),
            engine: "postgresql".to_string(),
            engine_version: "16".to_string(),
            flavor_id: "db.small".to_string(),
            volume_size_gb: 20,
            backup_schedule: None,
            parameters: BTreeMap::new(),
        }
    }

    fn detail() -> DbaasDetail {
        DbaasDetail {
            id: "db-1".to_string(),
            name: "orders".to_string(),
            status: "ACTIVE".to_string(),
            engine: "postgresql".to_string(),
            engine_version: "16".to_string(),
            flavor_id: "db.small".to_string(),
            volume_size_gb: 20,
            backup_schedule: None,
            parameters: BTreeMap::new(),
            apply_parameters_pending: false,
        }
    }

    #[test]
    fn test_upper_case_error_prefix() {
        let alphabet = DbaasCluster::ALPHABET;
        let classifier = alphabet.targeting(DbaasCluster::ACTIVE);
        assert_eq!(classifier.classify("ERROR_RESIZE"), StatusClass::Error);
        assert_eq!(classifier.classify("RESIZING"), StatusClass::Pending);
        assert_eq!(classifier.classify("error"), StatusClass::Unknown);
    }

    #[test]
    fn test_engine_validation() {
        assert!(DbaasCluster::validate(&spec()).is_ok());

        let mut unknown = spec();
        unknown.engine = "oracle".to_string();
        let err = DbaasCluster::validate(&unknown).unwrap_err();
        assert!(err.to_string().contains("postgresql, mysql, redis"));

        let mut bad_version = spec();
        bad_version.engine = "mysql".to_string();
        bad_version.engine_version = "16".to_string();
        assert!(DbaasCluster::validate(&bad_version).unwrap_err().is_validation());
    }

    #[test]
    fn test_ready_waits_for_parameters() {
        let mut pending = detail();
        pending.apply_parameters_pending = true;
        assert!(!DbaasCluster::ready(&pending));
        assert!(DbaasCluster::ready(&detail()));
    }

    #[test]
    fn test_update_order() {
        let mut desired = spec();
        desired.parameters = BTreeMap::from([("max_connections".to_string(), "200".to_string())]);
        desired.backup_schedule = Some("02:30".to_string());
        desired.volume_size_gb = 50;
        desired.flavor_id = "db.large".to_string();

        let deltas = DbaasCluster::plan_update(&detail(), &desired).unwrap();
        assert!(matches!(deltas[0], DbaasDelta::Flavor { .. }));
        assert_eq!(deltas[1], DbaasDelta::Volume { size_gb: 50 });
        assert_eq!(deltas[2], DbaasDelta::BackupSchedule(Some("02:30".to_string())));
        assert!(matches!(deltas[3], DbaasDelta::Parameters(_)));
        assert_eq!(deltas.len(), 4);
    }

    #[test]
    fn test_engine_change_is_rejected() {
        let mut desired = spec();
        desired.engine = "mysql".to_string();
        desired.engine_version = "8.0".to_string();
        let err = DbaasCluster::plan_update(&detail(), &desired).unwrap_err();
        assert!(err.to_string().contains("engine"));
    }

    #[test]
    fn test_volume_cannot_shrink() {
        let mut desired = spec();
        desired.volume_size_gb = 10;
        assert!(DbaasCluster::plan_update(&detail(), &desired).is_err());
    }

    #[test]
    fn test_parameters_use_put() {
        let call = DbaasCluster::update_call(&DbaasDelta::Parameters(BTreeMap::new()));
        assert_eq!(call.verb, Verb::Put);
        assert_eq!(call.action, Some("parameters"));
    }
}
