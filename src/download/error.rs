use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Failed to build HTTP client for downloads")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Failed to create download directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    // Stream errors, read timeouts and local write errors while copying the body.
    #[error("Transfer of {0} was interrupted")]
    Transfer(String, #[source] std::io::Error),

    #[error("Failed to write download file '{0}'")]
    Write(PathBuf, #[source] std::io::Error),
}
