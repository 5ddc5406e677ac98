//! Command line surface of the `nwp-download` binary.

use crate::catalog::api_key::{ApiKey, API_KEY_ENV};
use crate::catalog::error::CatalogError;
use crate::config::settings::Config;
use crate::error::NwpError;
use crate::logging::init_logging;
use crate::pipeline::driver::{DownloadRequest, Pipeline, PipelineOutput};
use crate::types::cycle::Cycle;
use crate::types::model::Model;
use clap::{Args, Parser, Subcommand};
use log::{debug, error, info, LevelFilter};
use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "nwp-download",
    version,
    about = "Download NWP forecast files for one model run"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Query the catalog, download the cycle and optionally filter it.
    Download(DownloadArgs),
}

#[derive(Args)]
pub struct DownloadArgs {
    /// Log level (ERROR, WARN, INFO, DEBUG, TRACE or OFF).
    #[arg(short = 'l', long, default_value = "DEBUG")]
    pub log_level: LevelFilter,

    /// Model run to download, e.g. 2024-01-01T00:00:00.
    #[arg(short = 'c', long)]
    pub cycle: Cycle,

    /// YAML configuration file.
    #[arg(long, default_value = "dmi_nwp_download/config.yaml")]
    pub config: PathBuf,

    #[arg(long, default_value = "harmonie_dini_sf")]
    pub model: Model,

    /// Download only the first N files of the cycle.
    #[arg(long, value_name = "N")]
    pub limit_files: Option<usize>,

    /// Keep the downloaded files after filtering.
    #[arg(long)]
    pub no_clean: bool,

    /// Directory for downloads and the filtered artifact.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Forecast API key.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Parses the process arguments, runs the chosen command and returns the
/// exit status.
pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Download(args) => download(args).await,
    }
}

async fn download(args: DownloadArgs) -> ExitCode {
    if let Err(e) = init_logging(args.log_level) {
        eprintln!("Could not initialise logging: {e}");
    }
    info!("Starting nwp-download job");
    if args.log_level >= LevelFilter::Debug {
        log_arguments(&args);
    }

    match execute(&args).await {
        Ok(PipelineOutput::Downloaded(paths)) => {
            info!("Job finished, {} files downloaded", paths.len());
            ExitCode::SUCCESS
        }
        Ok(PipelineOutput::Filtered(report)) => {
            info!(
                "Job finished, {} files merged into {}",
                report.merged,
                report.artifact.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            let mut source = err.source();
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::from(err.exit_code())
        }
    }
}

/// Loads the configuration named in `args` and runs the whole pipeline.
pub async fn execute(args: &DownloadArgs) -> Result<PipelineOutput, NwpError> {
    let config = Config::load(&args.config)?;

    let api_key = match args.api_key.as_deref() {
        Some(key) => ApiKey::new(key)?,
        None => return Err(CatalogError::MissingCredential(API_KEY_ENV.to_string()).into()),
    };

    let request = DownloadRequest::builder()
        .model(args.model)
        .cycle(args.cycle)
        .maybe_limit(args.limit_files)
        .no_clean(args.no_clean)
        .output_dir(args.output_dir.clone())
        .build();

    let pipeline = Pipeline::from_config(&config, &request, api_key)?;
    Ok(pipeline.run().await?)
}

fn log_arguments(args: &DownloadArgs) {
    debug!("Arguments:");
    debug!("  log_level: {}", args.log_level);
    debug!("  cycle: {}", args.cycle);
    debug!("  config: {}", args.config.display());
    debug!("  model: {}", args.model);
    debug!("  limit_files: {:?}", args.limit_files);
    debug!("  no_clean: {}", args.no_clean);
    debug!("  output_dir: {}", args.output_dir.display());
}
