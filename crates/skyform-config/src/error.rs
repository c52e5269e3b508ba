use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Configuration file not found. Checked:\n\
        - SKYFORM_CONFIG_PATH\n\
        - current directory: skyform.local.yaml, skyform.yaml\n\
        - ./.skyform/ directory\n\
        - ~/.config/skyform/skyform.yaml"
    )]
    ConfigFileNotFound,

    #[error("{0} is not set (config file or environment)")]
    MissingSetting(&'static str),

    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
