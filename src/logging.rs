use chrono::Utc;
use env_logger::{Builder, Target};
use log::{LevelFilter, SetLoggerError};
use std::io::Write;

/// Installs the process-wide logger. Call once, before anything logs.
///
/// Lines look like `2024-01-01 06:00:00 INFO Downloading ...`. The HTTP stack
/// is held at `WARN` so `DEBUG` output stays readable.
pub fn init_logging(level: LevelFilter) -> Result<(), SetLoggerError> {
    Builder::new()
        .filter_level(level)
        .filter_module("reqwest", level.min(LevelFilter::Warn))
        .filter_module("hyper", level.min(LevelFilter::Warn))
        .filter_module("hyper_util", level.min(LevelFilter::Warn))
        .target(Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .try_init()
}
