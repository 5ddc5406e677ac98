use crate::catalog::error::CatalogError;
use crate::download::error::DownloadError;
use crate::filter::error::FilterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("All {0} downloads failed, nothing to filter")]
    NoFilesDownloaded(usize),
}
