use crate::catalog::error::CatalogError;
use crate::config::error::ConfigError;
use crate::filter::error::FilterError;
use crate::pipeline::error::PipelineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NwpError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<CatalogError> for NwpError {
    fn from(error: CatalogError) -> Self {
        NwpError::Pipeline(PipelineError::Catalog(error))
    }
}

impl NwpError {
    /// Process exit status for this error: `2` configuration, `3` missing
    /// credential, `4` catalog, `1` everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            NwpError::Config(_) | NwpError::Pipeline(PipelineError::Filter(FilterError::Config(_))) => 2,
            NwpError::Pipeline(PipelineError::Catalog(CatalogError::MissingCredential(_))) => 3,
            NwpError::Pipeline(PipelineError::Catalog(_)) => 4,
            NwpError::Pipeline(_) => 1,
        }
    }
}
