mod catalog;
mod config;
mod download;
mod error;
mod filter;
mod pipeline;
mod types;

pub mod cli;
pub mod logging;

pub use error::NwpError;

pub use types::asset::Asset;
pub use types::cycle::{Cycle, CycleParseError};
pub use types::model::{Model, UnknownModel};

pub use catalog::api_key::{ApiKey, API_KEY_ENV};
pub use catalog::client::CatalogClient;
pub use catalog::error::CatalogError;

pub use download::downloader::{Downloader, DEFAULT_WORKERS};
pub use download::error::DownloadError;
pub use download::report::{DownloadReport, DownloadResult};

pub use config::error::ConfigError;
pub use config::parameter::{ParameterSpec, SelectionRule};
pub use config::settings::{Config, DownloadConfig};

pub use filter::error::FilterError;
pub use filter::parameter_filter::{artifact_name, FilterReport, ParameterFilter};
pub use filter::rules::RuleSet;

pub use pipeline::driver::{DownloadRequest, Pipeline, PipelineOutput};
pub use pipeline::error::PipelineError;
