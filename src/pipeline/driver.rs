use crate::catalog::api_key::ApiKey;
use crate::catalog::client::CatalogClient;
use crate::config::settings::Config;
use crate::download::downloader::Downloader;
use crate::filter::parameter_filter::{FilterReport, ParameterFilter};
use crate::pipeline::error::PipelineError;
use crate::types::cycle::Cycle;
use crate::types::model::Model;
use log::{error, info, warn};
use std::ffi::OsString;
use std::path::PathBuf;

/// What to fetch and where to put it.
#[derive(Debug, Clone, bon::Builder)]
pub struct DownloadRequest {
    pub model: Model,
    pub cycle: Cycle,
    /// Only the first `limit` catalog entries are downloaded.
    pub limit: Option<usize>,
    #[builder(default)]
    pub no_clean: bool,
    #[builder(into, default = PathBuf::from("."))]
    pub output_dir: PathBuf,
    /// Where the ecCodes tools are looked up instead of `PATH`.
    pub search_path: Option<OsString>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutput {
    /// Filtering is disabled; the downloaded files in catalog order.
    Downloaded(Vec<PathBuf>),
    Filtered(FilterReport),
}

/// Catalog query, download and, when configured, filtering for one cycle.
pub struct Pipeline {
    catalog: CatalogClient,
    downloader: Downloader,
    filter: Option<ParameterFilter>,
    model: Model,
    cycle: Cycle,
    limit: Option<usize>,
}

impl Pipeline {
    /// Wires the stages together from `config`.
    ///
    /// With `filter_parameters` set the parameters are validated and the
    /// ecCodes tools located here, so a broken setup fails before anything is
    /// downloaded.
    pub fn from_config(
        config: &Config,
        request: &DownloadRequest,
        api_key: ApiKey,
    ) -> Result<Self, PipelineError> {
        let settings = &config.download;

        let catalog = CatalogClient::builder()
            .stac_url(settings.stac_url.trim())
            .api_key(api_key)
            .build()?;

        let downloader = Downloader::builder()
            .download_dir(request.output_dir.clone())
            .maybe_workers(request.workers)
            .connect_timeout(settings.connect_timeout())
            .read_timeout(settings.read_timeout())
            .build()?;

        let filter = if settings.filter_parameters {
            let filter = ParameterFilter::builder()
                .parameters(settings.parameters.clone().unwrap_or_default())
                .model(request.model)
                .cycle(request.cycle)
                .output_dir(request.output_dir.clone())
                .convert_to_ccsds(settings.convert_to_ccsds)
                .no_clean(request.no_clean)
                .maybe_search_path(request.search_path.clone())
                .tool_timeout(settings.tool_timeout())
                .build()?;
            Some(filter)
        } else {
            None
        };

        Ok(Self {
            catalog,
            downloader,
            filter,
            model: request.model,
            cycle: request.cycle,
            limit: request.limit,
        })
    }

    pub fn filters(&self) -> bool {
        self.filter.is_some()
    }

    pub async fn run(&self) -> Result<PipelineOutput, PipelineError> {
        let assets = self
            .catalog
            .fetch_assets()
            .model(self.model)
            .cycle(self.cycle)
            .maybe_limit(self.limit)
            .call()
            .await?;

        let report = self.downloader.download_all(&assets).await?;
        for (index, url, error) in report.failures() {
            warn!("Asset {} ({}) was not downloaded: {}", index, url, error);
        }
        let paths = report.successful_paths();

        let Some(filter) = &self.filter else {
            if paths.is_empty() {
                warn!("No files were downloaded");
            }
            info!("Parameter filtering disabled, {} files downloaded", paths.len());
            return Ok(PipelineOutput::Downloaded(paths));
        };

        if paths.is_empty() {
            error!("Every download failed, skipping the filter stage");
            return Err(PipelineError::NoFilesDownloaded(report.len()));
        }
        let filtered = filter.run(&paths).await?;
        info!("Artifact written to {}", filtered.artifact.display());
        Ok(PipelineOutput::Filtered(filtered))
    }
}
