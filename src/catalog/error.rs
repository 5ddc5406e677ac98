use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("No forecast API key found; set {0} or pass --api-key")]
    MissingCredential(String),

    #[error("Failed to build HTTP client for the catalog")]
    ClientBuild(#[source] reqwest::Error),

    // Endpoints never carry the query string, so the API key stays out of logs.
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("Catalog request to {endpoint} failed with status {status}")]
    Unavailable {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to parse catalog response from {0}")]
    JsonParse(String, #[source] reqwest::Error),

    #[error("Catalog returned no files for {model} cycle {cycle}")]
    EmptyCatalog { model: String, cycle: String },

    #[error("Catalog feature {index} has no file name in its href '{href}'")]
    InvalidAssetUrl { index: usize, href: String },

    #[error("Catalog features {first} and {second} would both be saved as '{name}'")]
    DuplicateFileName {
        first: usize,
        second: usize,
        name: String,
    },
}
