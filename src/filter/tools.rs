//! The ecCodes command line tools the filter stage drives.

use crate::filter::error::FilterError;
use log::debug;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;

pub const GRIB_FILTER: &str = "grib_filter";
pub const GRIB_COPY: &str = "grib_copy";
pub const GRIB_SET: &str = "grib_set";
const CCSDS_PACKING: &str = "packingType=grid_ccsds";

/// Captured result of one tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stderr: String,
}

/// Absolute locations of the tools plus the time each run may take.
#[derive(Debug, Clone)]
pub struct GribTools {
    filter: PathBuf,
    copy: PathBuf,
    set: Option<PathBuf>,
    timeout: Duration,
}

impl GribTools {
    /// Finds the tools on `search_path` (a `PATH`-style list). `grib_set` is only
    /// looked up when `with_set` is true.
    ///
    /// # Errors
    ///
    /// [`FilterError::ToolNotFound`] naming the first missing tool.
    pub fn locate(
        search_path: &OsStr,
        with_set: bool,
        timeout: Duration,
    ) -> Result<Self, FilterError> {
        let find = |name: &str| {
            find_executable(name, search_path)
                .ok_or_else(|| FilterError::ToolNotFound(name.to_string()))
        };

        let filter = find(GRIB_FILTER)?;
        let copy = find(GRIB_COPY)?;
        let set = if with_set { Some(find(GRIB_SET)?) } else { None };
        debug!(
            "Using {} and {}{}",
            filter.display(),
            copy.display(),
            set.as_ref()
                .map(|s| format!(" and {}", s.display()))
                .unwrap_or_default()
        );

        Ok(Self {
            filter,
            copy,
            set,
            timeout,
        })
    }

    /// `grib_filter -o <output> <rules> <input>`
    pub fn filter_command(&self, rules: &Path, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.filter);
        command.arg("-o").arg(output).arg(rules).arg(input);
        command
    }

    /// `grib_copy <inputs...> <output>`
    pub fn merge_command(&self, inputs: &[PathBuf], output: &Path) -> Command {
        let mut command = Command::new(&self.copy);
        command.args(inputs).arg(output);
        command
    }

    /// `grib_set -r -s packingType=grid_ccsds <input> <output>`
    pub fn reencode_command(&self, input: &Path, output: &Path) -> Option<Command> {
        let set = self.set.as_ref()?;
        let mut command = Command::new(set);
        command
            .arg("-r")
            .arg("-s")
            .arg(CCSDS_PACKING)
            .arg(input)
            .arg(output);
        Some(command)
    }

    /// Runs `command` to completion with stdout and stderr captured.
    ///
    /// The child is killed if it outlives the configured timeout.
    pub async fn execute(&self, tool: &str, mut command: Command) -> Result<ToolOutput, FilterError> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!("Running: {:?}", command.as_std());

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|e| FilterError::ToolSpawn(tool.to_string(), e))?,
            Err(_) => {
                return Err(FilterError::ToolTimedOut {
                    tool: tool.to_string(),
                    after: self.timeout,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !stdout.is_empty() {
            debug!("{} output: {}", tool, stdout);
        }
        Ok(ToolOutput {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// First executable called `name` in the `PATH`-style list `search_path`.
pub fn find_executable(name: &str, search_path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn install(dir: &Path, name: &str, script: &str) {
        let path = dir.join(name);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn finds_only_executables() {
        let bin = TempDir::new().unwrap();
        std::fs::write(bin.path().join("grib_filter"), "not executable").unwrap();
        assert!(find_executable("grib_filter", bin.path().as_os_str()).is_none());

        install(bin.path(), "grib_filter", "#!/bin/sh\n");
        assert_eq!(
            find_executable("grib_filter", bin.path().as_os_str()),
            Some(bin.path().join("grib_filter"))
        );
    }

    #[test]
    fn missing_tool_is_reported_by_name() {
        let bin = TempDir::new().unwrap();
        install(bin.path(), "grib_filter", "#!/bin/sh\n");
        let err = GribTools::locate(bin.path().as_os_str(), false, Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, FilterError::ToolNotFound(tool) if tool == GRIB_COPY));
    }

    #[test]
    fn commands_use_the_documented_argument_order() {
        let bin = TempDir::new().unwrap();
        for tool in [GRIB_FILTER, GRIB_COPY, GRIB_SET] {
            install(bin.path(), tool, "#!/bin/sh\n");
        }
        let tools = GribTools::locate(bin.path().as_os_str(), true, Duration::from_secs(5)).unwrap();

        let filter = tools.filter_command(Path::new("r.filter"), Path::new("in.grib"), Path::new("out.grib"));
        let args: Vec<_> = filter.as_std().get_args().collect();
        assert_eq!(args, ["-o", "out.grib", "r.filter", "in.grib"]);

        let merge = tools.merge_command(
            &[PathBuf::from("a.grib"), PathBuf::from("b.grib")],
            Path::new("all.grib"),
        );
        let args: Vec<_> = merge.as_std().get_args().collect();
        assert_eq!(args, ["a.grib", "b.grib", "all.grib"]);

        let set = tools
            .reencode_command(Path::new("all.grib"), Path::new("all.tmp"))
            .unwrap();
        let args: Vec<_> = set.as_std().get_args().collect();
        assert_eq!(args, ["-r", "-s", "packingType=grid_ccsds", "all.grib", "all.tmp"]);
    }

    #[tokio::test]
    async fn captures_stderr_and_status() {
        let bin = TempDir::new().unwrap();
        install(bin.path(), GRIB_FILTER, "#!/bin/sh\necho 'bad rules' >&2\nexit 3\n");
        install(bin.path(), GRIB_COPY, "#!/bin/sh\n");
        let tools = GribTools::locate(bin.path().as_os_str(), false, Duration::from_secs(5)).unwrap();

        let output = tools
            .execute(
                GRIB_FILTER,
                tools.filter_command(Path::new("r"), Path::new("i"), Path::new("o")),
            )
            .await
            .unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(output.stderr, "bad rules");
    }

    #[tokio::test]
    async fn hung_tool_times_out() {
        let bin = TempDir::new().unwrap();
        install(bin.path(), GRIB_FILTER, "#!/bin/sh\nexec sleep 30\n");
        install(bin.path(), GRIB_COPY, "#!/bin/sh\n");
        let tools =
            GribTools::locate(bin.path().as_os_str(), false, Duration::from_millis(200)).unwrap();

        let err = tools
            .execute(
                GRIB_FILTER,
                tools.filter_command(Path::new("r"), Path::new("i"), Path::new("o")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::ToolTimedOut { .. }));
    }
}
