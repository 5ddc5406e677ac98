use crate::filter::error::FilterError;
use crate::filter::rules::RuleSet;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RULES_FILE: &str = "rules.filter";

/// Scratch space of one filtering run.
///
/// The scratch directory is deleted when the job is dropped, whichever way
/// the run ends.
#[derive(Debug)]
pub struct FilterJob {
    scratch: TempDir,
    rules_file: PathBuf,
    artifact: PathBuf,
}

impl FilterJob {
    /// Creates the scratch directory and writes the rendered `rules` into it.
    pub fn create(artifact: PathBuf, rules: &RuleSet) -> Result<Self, FilterError> {
        let scratch = tempfile::Builder::new()
            .prefix("nwp-filter-")
            .tempdir()
            .map_err(FilterError::ScratchDir)?;
        let rules_file = scratch.path().join(RULES_FILE);
        std::fs::write(&rules_file, rules.render())
            .map_err(|e| FilterError::RulesWrite(rules_file.clone(), e))?;
        debug!(
            "Wrote {} filter rules to {}",
            rules.len(),
            rules_file.display()
        );

        Ok(Self {
            scratch,
            rules_file,
            artifact,
        })
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    pub fn rules_file(&self) -> &Path {
        &self.rules_file
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Where the filtered copy of `input` is written.
    pub fn scratch_output(&self, input: &Path) -> PathBuf {
        self.scratch
            .path()
            .join(input.file_name().unwrap_or(input.as_os_str()))
    }

    /// Removes the scratch directory now, logging instead of failing.
    pub fn finish(self) {
        let dir = self.scratch.path().to_path_buf();
        if let Err(e) = self.scratch.close() {
            warn!("Could not remove scratch directory {}: {}", dir.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parameter::ParameterSpec;
    use std::collections::BTreeMap;

    fn rules() -> RuleSet {
        let parameters: BTreeMap<String, ParameterSpec> = serde_yaml::from_str(
            r#"
t2m:
  shortName: ["2t"]
  level: ["2"]
  levelType: ["sfc"]
  typeOfLevel: ["heightAboveGround"]
  typeOfStatisticalProcessing: ["0"]
"#,
        )
        .unwrap();
        RuleSet::from_parameters(&parameters).unwrap()
    }

    #[test]
    fn writes_rules_into_scratch() {
        let rules = rules();
        let job = FilterJob::create(PathBuf::from("/out/x.grib"), &rules).unwrap();
        assert_eq!(job.rules_file(), job.scratch_dir().join("rules.filter"));
        assert_eq!(
            std::fs::read_to_string(job.rules_file()).unwrap(),
            rules.render()
        );
        assert_eq!(
            job.scratch_output(Path::new("/downloads/a.grib")),
            job.scratch_dir().join("a.grib")
        );
    }

    #[test]
    fn scratch_is_removed_on_drop_and_finish() {
        let dropped = FilterJob::create(PathBuf::from("x.grib"), &rules()).unwrap();
        let dropped_dir = dropped.scratch_dir().to_path_buf();
        drop(dropped);
        assert!(!dropped_dir.exists());

        let finished = FilterJob::create(PathBuf::from("x.grib"), &rules()).unwrap();
        let finished_dir = finished.scratch_dir().to_path_buf();
        finished.finish();
        assert!(!finished_dir.exists());
    }
}
