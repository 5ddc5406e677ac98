use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse configuration file '{0}'")]
    Parse(PathBuf, #[source] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
