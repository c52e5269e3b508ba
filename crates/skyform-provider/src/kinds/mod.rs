//! Concrete resource kinds
//!
//! Each module pairs a [`ResourceKind`](skyform_cloud::ResourceKind) with its
//! [`RestKind`](skyform_api::RestKind) description.

pub mod attachment;
pub mod dbaas;
pub mod floating_ip;
pub mod instance;
pub mod kubernetes;
pub mod load_balancer;
pub mod volume;

pub use attachment::VolumeAttachment;
pub use dbaas::DbaasCluster;
pub use floating_ip::FloatingIp;
pub use instance::Instance;
pub use kubernetes::{KubernetesCluster, KubernetesNodeGroup};
pub use load_balancer::LoadBalancer;
pub use volume::Volume;

use skyform_cloud::{CloudError, Result};
use std::fmt::Debug;

pub(crate) fn require_name(kind: &'static str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CloudError::validation(kind, "name must not be empty"));
    }
    Ok(())
}

/// Fields that can only change by replacing the object
pub(crate) fn immutable<T: PartialEq + Debug + ?Sized>(
    kind: &'static str,
    field: &str,
    current: &T,
    desired: &T,
) -> Result<()> {
    if current != desired {
        return Err(CloudError::validation(
            kind,
            format!(
                "{} cannot be changed in place ({:?} -> {:?}); the resource must be replaced",
                field, current, desired
            ),
        ));
    }
    Ok(())
}

pub(crate) fn no_shrink(kind: &'static str, field: &str, current: u32, desired: u32) -> Result<()> {
    if desired < current {
        return Err(CloudError::validation(
            kind,
            format!("{} cannot shrink from {} to {}", field, current, desired),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_name() {
        assert!(require_name("skyform_volume", "data").is_ok());
        let err = require_name("skyform_volume", "  ").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("skyform_volume"));
    }

    #[test]
    fn test_immutable_names_both_values() {
        assert!(immutable("skyform_volume", "volume_type", "ssd", "ssd").is_ok());
        let err = immutable("skyform_volume", "volume_type", "ssd", "hdd").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("volume_type"));
        assert!(message.contains("\"ssd\""));
        assert!(message.contains("\"hdd\""));
    }

    #[test]
    fn test_no_shrink() {
        assert!(no_shrink("skyform_volume", "size_gb", 10, 10).is_ok());
        assert!(no_shrink("skyform_volume", "size_gb", 10, 20).is_ok());
        assert!(no_shrink("skyform_volume", "size_gb", 20, 10).unwrap_err().is_validation());
    }
}
