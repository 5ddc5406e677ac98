use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    nwp_download::cli::run().await
}
