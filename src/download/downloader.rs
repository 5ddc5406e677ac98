use crate::download::error::DownloadError;
use crate::download::report::{DownloadReport, DownloadResult};
use crate::types::asset::Asset;
use bon::bon;
use futures_util::{stream, StreamExt, TryStreamExt};
use log::{error, info, warn};
use reqwest::{Client, Response, StatusCode};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;

/// Number of transfers in flight at once.
pub const DEFAULT_WORKERS: usize = 4;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(120);
const WRITE_BUFFER_BYTES: usize = 1024 * 1024;

pub struct Downloader {
    client: Client,
    download_dir: PathBuf,
    workers: usize,
}

#[bon]
impl Downloader {
    /// Creates a downloader writing into `download_dir`.
    ///
    /// Timeouts apply per connection attempt and per read on the body, so a
    /// large file that keeps flowing is never cut off but a stalled one is.
    #[builder]
    pub fn new(
        #[builder(into)] download_dir: PathBuf,
        workers: Option<usize>,
        connect_timeout: Option<Duration>,
        read_timeout: Option<Duration>,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
            .read_timeout(read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT))
            .build()
            .map_err(DownloadError::ClientBuild)?;
        Ok(Self {
            client,
            download_dir,
            workers: workers.unwrap_or(DEFAULT_WORKERS).max(1),
        })
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Where `asset` ends up locally. Depends only on the asset URL.
    pub fn target_path(&self, asset: &Asset) -> PathBuf {
        self.download_dir.join(asset.file_name())
    }

    /// Downloads every asset, at most `workers` at a time.
    ///
    /// A failing asset never stops the others; its failure is recorded in the
    /// report and logged. Files that already exist are not fetched again.
    ///
    /// # Errors
    ///
    /// Only [`DownloadError::DirCreation`]; per-asset failures live in the report.
    pub async fn download_all(&self, assets: &[Asset]) -> Result<DownloadReport, DownloadError> {
        fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| DownloadError::DirCreation(self.download_dir.clone(), e))?;

        info!(
            "Downloading {} files into {} with {} workers",
            assets.len(),
            self.download_dir.display(),
            self.workers
        );

        let results: BTreeMap<usize, DownloadResult> = stream::iter(assets)
            .map(|asset| async move { (asset.index(), self.download_one(asset).await) })
            .buffer_unordered(self.workers)
            .collect()
            .await;
        let report = DownloadReport::from(results);

        let failed = report.len() - report.succeeded();
        if failed > 0 {
            warn!(
                "{} of {} downloads failed, continuing with the rest",
                failed,
                report.len()
            );
        } else {
            info!("All {} files are available locally", report.len());
        }
        Ok(report)
    }

    async fn download_one(&self, asset: &Asset) -> DownloadResult {
        let target = self.target_path(asset);

        if fs::try_exists(&target).await.unwrap_or(false) {
            info!("{} already exists, skipping download", target.display());
            return DownloadResult::AlreadyPresent(target);
        }

        match self.fetch(asset.url(), &target).await {
            Ok(bytes) => {
                info!("Downloaded {} ({} bytes)", target.display(), bytes);
                DownloadResult::Fetched(target)
            }
            Err(error) => {
                error!("Failed to download {}: {}", asset.url(), error);
                DownloadResult::Failed {
                    url: asset.url().to_string(),
                    error,
                }
            }
        }
    }

    /// Streams `url` into a `.part` sibling of `target` and renames it into
    /// place once the body is complete.
    async fn fetch(&self, url: &str, target: &Path) -> Result<u64, DownloadError> {
        info!("Downloading {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::NetworkRequest(url.to_string(), e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let partial = partial_path(target);
        let written = match stream_to_file(response, url, &partial).await {
            Ok(written) => written,
            Err(e) => {
                discard(&partial).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&partial, target).await {
            discard(&partial).await;
            return Err(DownloadError::Write(target.to_path_buf(), e));
        }
        Ok(written)
    }
}

async fn stream_to_file(response: Response, url: &str, path: &Path) -> Result<u64, DownloadError> {
    let stream = response
        .bytes_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    let mut reader = StreamReader::new(stream);

    let file = File::create(path)
        .await
        .map_err(|e| DownloadError::Write(path.to_path_buf(), e))?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, file);

    let written = tokio::io::copy(&mut reader, &mut writer)
        .await
        .map_err(|e| DownloadError::Transfer(url.to_string(), e))?;
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::Write(path.to_path_buf(), e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| DownloadError::Write(path.to_path_buf(), e))?;
    Ok(written)
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    target.with_file_name(name)
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove partial file {}: {}", path.display(), e);
        }
    }
}
