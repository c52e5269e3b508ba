pub mod error;

pub use error::*;

use serde::Deserialize;
use skyform_cloud::{RetryConfig, TimingOverrides};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "SKYFORM_CONFIG_PATH";
pub const ENDPOINT_ENV: &str = "SKYFORM_ENDPOINT";
pub const TOKEN_ENV: &str = "SKYFORM_TOKEN";
pub const REGION_ENV: &str = "SKYFORM_REGION";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const CANDIDATES: [&str; 2] = ["skyform.local.yaml", "skyform.yaml"];

/// Provider configuration
///
/// ```yaml
/// endpoint: https://api.example.cloud
/// region: eu-1
/// polling:
///   kinds:
///     skyform_kubernetes_cluster:
///       create_timeout_secs: 7200
///   transient_retry:
///     max_attempts: 3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub region: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub polling: PollingConfig,
}

/// Poll timing overrides
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    /// Per resource type name
    pub kinds: BTreeMap<String, TimingOverrides>,
    /// Retry transient fetch failures while polling (off unless set)
    pub transient_retry: Option<RetryConfig>,
}

impl PollingConfig {
    pub fn overrides_for(&self, type_name: &str) -> TimingOverrides {
        self.kinds.get(type_name).cloned().unwrap_or_default()
    }
}

impl ProviderConfig {
    /// Parse YAML text; `origin` is only used in error messages
    pub fn from_yaml(content: &str, origin: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content, path)
    }

    /// Discovered file (if any) with environment overrides applied
    pub fn resolve() -> Result<Self> {
        let config = match find_config_file() {
            Ok(path) => Self::load(&path)?,
            Err(ConfigError::ConfigFileNotFound) => Self::default(),
            Err(e) => return Err(e),
        };
        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Environment-style overrides; non-empty values win over the file
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            self.endpoint = Some(endpoint);
        }
        if let Some(token) = lookup(TOKEN_ENV) {
            self.token = Some(token);
        }
        if let Some(region) = lookup(REGION_ENV) {
            self.region = Some(region);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        for (kind, overrides) in &self.polling.kinds {
            let fields = [
                ("create_timeout_secs", overrides.create_timeout_secs),
                ("update_timeout_secs", overrides.update_timeout_secs),
                ("delete_timeout_secs", overrides.delete_timeout_secs),
                ("interval_secs", overrides.interval_secs),
            ];
            if let Some((field, _)) = fields.iter().find(|(_, secs)| *secs == Some(0)) {
                return Err(ConfigError::Invalid(format!(
                    "polling.kinds.{}.{} must be greater than zero",
                    kind, field
                )));
            }
        }
        if let Some(retry) = &self.polling.transient_retry {
            if retry.multiplier < 1.0 {
                return Err(ConfigError::Invalid(
                    "polling.transient_retry.multiplier must be at least 1.0".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Result<&str> {
        self.endpoint
            .as_deref()
            .ok_or(ConfigError::MissingSetting(ENDPOINT_ENV))
    }

    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or(ConfigError::MissingSetting(TOKEN_ENV))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

/// Skyform's directory under the user config dir
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skyform"))
}

/// Locate the configuration file
///
/// Search order:
/// 1. `SKYFORM_CONFIG_PATH`
/// 2. current directory: skyform.local.yaml, skyform.yaml
/// 3. `./.skyform/` directory, same order
/// 4. `~/.config/skyform/skyform.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    for dir in [current_dir.clone(), current_dir.join(".skyform")] {
        for filename in &CANDIDATES {
            let path = dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = get_config_dir() {
        let global_config = config_dir.join("skyform.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}
