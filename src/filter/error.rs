use crate::config::error::ConfigError;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} not found in $PATH")]
    ToolNotFound(String),

    #[error("Failed to create scratch directory")]
    ScratchDir(#[source] std::io::Error),

    #[error("Failed to write filter rules to '{0}'")]
    RulesWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to start {0}")]
    ToolSpawn(String, #[source] std::io::Error),

    #[error("{tool} did not finish within {after:?}")]
    ToolTimedOut { tool: String, after: Duration },

    #[error("Filtering '{input}' failed with {status}: {stderr}")]
    FilterToolFailed {
        input: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Merging into '{output}' failed with {status}: {stderr}")]
    MergeToolFailed {
        output: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Re-encoding '{artifact}' failed with {status}: {stderr}")]
    ReencodeFailed {
        artifact: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("None of the {0} input files produced filtered output")]
    NothingToMerge(usize),

    #[error("Failed to replace '{0}' with its re-encoded copy")]
    Rename(PathBuf, #[source] std::io::Error),
}
