use crate::config::parameter::ParameterSpec;
use crate::filter::error::FilterError;
use crate::filter::job::FilterJob;
use crate::filter::rules::RuleSet;
use crate::filter::tools::{GribTools, GRIB_COPY, GRIB_FILTER, GRIB_SET};
use crate::types::cycle::Cycle;
use crate::types::model::Model;
use bon::bon;
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(900);

/// Name of the merged file for `model` and `cycle`, e.g.
/// `harmonie_dini_sf_2024-01-01T00:00:00Z.grib`.
pub fn artifact_name(model: Model, cycle: &Cycle) -> String {
    format!("{}_{}.grib", model, cycle.iso_z())
}

/// What a filtering run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterReport {
    pub artifact: PathBuf,
    /// Number of filtered files that went into the artifact.
    pub merged: usize,
    /// Inputs left out because filtering failed or matched nothing.
    pub excluded: Vec<PathBuf>,
    pub reencoded: bool,
    pub inputs_removed: usize,
}

/// Cuts downloaded GRIB files down to the configured parameters and merges
/// them into a single artifact.
#[derive(Debug)]
pub struct ParameterFilter {
    rules: RuleSet,
    tools: GribTools,
    artifact: PathBuf,
    convert_to_ccsds: bool,
    no_clean: bool,
}

#[bon]
impl ParameterFilter {
    /// Validates `parameters` and locates the ecCodes tools.
    ///
    /// Tools are searched on `search_path`, or on `PATH` when it is not set.
    ///
    /// # Errors
    ///
    /// [`FilterError::Config`] for invalid parameters (checked first), then
    /// [`FilterError::ToolNotFound`] for a missing tool.
    #[builder]
    pub fn new(
        parameters: BTreeMap<String, ParameterSpec>,
        model: Model,
        cycle: Cycle,
        #[builder(into)] output_dir: Option<PathBuf>,
        #[builder(default)] convert_to_ccsds: bool,
        #[builder(default)] no_clean: bool,
        search_path: Option<OsString>,
        tool_timeout: Option<Duration>,
    ) -> Result<Self, FilterError> {
        let rules = RuleSet::from_parameters(&parameters)?;

        let search_path = search_path
            .or_else(|| std::env::var_os("PATH"))
            .unwrap_or_default();
        let tools = GribTools::locate(
            &search_path,
            convert_to_ccsds,
            tool_timeout.unwrap_or(DEFAULT_TOOL_TIMEOUT),
        )?;

        let artifact = output_dir
            .unwrap_or_else(|| PathBuf::from("."))
            .join(artifact_name(model, &cycle));

        Ok(Self {
            rules,
            tools,
            artifact,
            convert_to_ccsds,
            no_clean,
        })
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Filters every input, merges the results into [`Self::artifact`] and,
    /// when enabled, re-encodes it with CCSDS packing.
    ///
    /// Inputs whose filtering fails are logged and left out of the merge. The
    /// originals are deleted only after a successful merge, and only when
    /// `no_clean` is not set.
    ///
    /// # Errors
    ///
    /// [`FilterError::NothingToMerge`] when no input produced output,
    /// [`FilterError::MergeToolFailed`] when merging fails, plus scratch setup
    /// and tool start-up failures. A failed re-encode is not an error.
    pub async fn run(&self, inputs: &[PathBuf]) -> Result<FilterReport, FilterError> {
        let job = FilterJob::create(self.artifact.clone(), &self.rules)?;
        info!(
            "Filtering {} files with {} rules",
            inputs.len(),
            self.rules.len()
        );

        let mut filtered = Vec::with_capacity(inputs.len());
        let mut excluded = Vec::new();
        for input in inputs {
            match self.filter_one(&job, input).await {
                Ok(Some(output)) => filtered.push(output),
                Ok(None) => {
                    warn!(
                        "No messages in {} matched the filter rules",
                        input.display()
                    );
                    excluded.push(input.clone());
                }
                Err(e) => {
                    error!("{}", e);
                    excluded.push(input.clone());
                }
            }
        }
        if !excluded.is_empty() {
            warn!(
                "{} of {} files excluded from the merge",
                excluded.len(),
                inputs.len()
            );
        }
        if filtered.is_empty() {
            return Err(FilterError::NothingToMerge(inputs.len()));
        }

        self.merge(&filtered, job.artifact()).await?;
        info!(
            "Merged {} files into {}",
            filtered.len(),
            job.artifact().display()
        );

        let reencoded = if self.convert_to_ccsds {
            match self.reencode(job.artifact()).await {
                Ok(()) => true,
                Err(e) => {
                    error!("{}, keeping the original packing", e);
                    false
                }
            }
        } else {
            false
        };
        job.finish();

        let inputs_removed = if self.no_clean {
            info!("Keeping {} downloaded files", inputs.len());
            0
        } else {
            remove_inputs(inputs).await
        };

        Ok(FilterReport {
            artifact: self.artifact.clone(),
            merged: filtered.len(),
            excluded,
            reencoded,
            inputs_removed,
        })
    }

    /// The filtered copy of `input`, or `None` when nothing matched.
    async fn filter_one(&self, job: &FilterJob, input: &Path) -> Result<Option<PathBuf>, FilterError> {
        let output = job.scratch_output(input);
        info!("Filtering {}", input.display());
        let result = self
            .tools
            .execute(
                GRIB_FILTER,
                self.tools.filter_command(job.rules_file(), input, &output),
            )
            .await?;
        if !result.status.success() {
            return Err(FilterError::FilterToolFailed {
                input: input.to_path_buf(),
                status: result.status,
                stderr: result.stderr,
            });
        }

        let produced = fs::metadata(&output)
            .await
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        Ok(produced.then_some(output))
    }

    async fn merge(&self, filtered: &[PathBuf], artifact: &Path) -> Result<(), FilterError> {
        let result = self
            .tools
            .execute(GRIB_COPY, self.tools.merge_command(filtered, artifact))
            .await?;
        if !result.status.success() {
            return Err(FilterError::MergeToolFailed {
                output: artifact.to_path_buf(),
                status: result.status,
                stderr: result.stderr,
            });
        }
        Ok(())
    }

    async fn reencode(&self, artifact: &Path) -> Result<(), FilterError> {
        let temp = reencode_path(artifact);
        let Some(command) = self.tools.reencode_command(artifact, &temp) else {
            return Err(FilterError::ToolNotFound(GRIB_SET.to_string()));
        };
        info!("Converting {} to CCSDS packing", artifact.display());

        let outcome = match self.tools.execute(GRIB_SET, command).await {
            Ok(result) if result.status.success() => fs::rename(&temp, artifact)
                .await
                .map_err(|e| FilterError::Rename(artifact.to_path_buf(), e)),
            Ok(result) => Err(FilterError::ReencodeFailed {
                artifact: artifact.to_path_buf(),
                status: result.status,
                stderr: result.stderr,
            }),
            Err(e) => Err(e),
        };
        if outcome.is_err() {
            discard(&temp).await;
        }
        outcome
    }
}

fn reencode_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.file_name().unwrap_or_default().to_os_string();
    name.push(".ccsds.tmp");
    artifact.with_file_name(name)
}

async fn remove_inputs(inputs: &[PathBuf]) -> usize {
    let mut removed = 0;
    for input in inputs {
        match fs::remove_file(input).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("Could not remove {}: {}", input.display(), e),
        }
    }
    info!("Removed {} downloaded files", removed);
    removed
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}
