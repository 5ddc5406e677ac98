use crate::download::error::DownloadError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Outcome of downloading a single asset.
#[derive(Debug)]
pub enum DownloadResult {
    /// The file was transferred during this run.
    Fetched(PathBuf),
    /// A file with the target name was already on disk and was left untouched.
    AlreadyPresent(PathBuf),
    Failed { url: String, error: DownloadError },
}

impl DownloadResult {
    pub fn path(&self) -> Option<&Path> {
        match self {
            DownloadResult::Fetched(path) | DownloadResult::AlreadyPresent(path) => Some(path),
            DownloadResult::Failed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.path().is_some()
    }
}

/// Per-asset results of one download run, keyed by the asset's catalog index.
#[derive(Debug, Default)]
pub struct DownloadReport {
    results: BTreeMap<usize, DownloadResult>,
}

impl DownloadReport {
    pub fn get(&self, index: usize) -> Option<&DownloadResult> {
        self.results.get(&index)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|r| r.is_success()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &DownloadResult)> {
        self.results.iter().map(|(index, result)| (*index, result))
    }

    /// `(index, url, error)` for every asset that could not be downloaded.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &str, &DownloadError)> {
        self.results.iter().filter_map(|(index, result)| match result {
            DownloadResult::Failed { url, error } => Some((*index, url.as_str(), error)),
            _ => None,
        })
    }

    /// Local paths of every successful asset, in catalog order regardless of
    /// the order the transfers finished in.
    pub fn successful_paths(&self) -> Vec<PathBuf> {
        self.results
            .values()
            .filter_map(|result| result.path().map(Path::to_path_buf))
            .collect()
    }
}

impl From<BTreeMap<usize, DownloadResult>> for DownloadReport {
    fn from(results: BTreeMap<usize, DownloadResult>) -> Self {
        Self { results }
    }
}

impl FromIterator<(usize, DownloadResult)> for DownloadReport {
    fn from_iter<T: IntoIterator<Item = (usize, DownloadResult)>>(iter: T) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}
