//! SoftEscrow CLI
//!
//! Uploads a file to a SoftEscrow container and prints the URL of the
//! deposit certificate.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;

use softescrow::cli::{Cli, Command, UploadArgs};
use softescrow::config::Config;
use softescrow::logging::init_logging;
use softescrow::{HttpEscrowApi, UploadRequest, Uploader};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::from_env();
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    if let Some(api_key) = cli.api_key {
        config.api.api_key = Some(api_key);
    }
    if let Some(concurrency) = cli.concurrency {
        config.upload.concurrency = concurrency.max(1);
    }

    match cli.command {
        Command::Upload(args) => upload(&config, args).await,
    }
}

async fn upload(config: &Config, args: UploadArgs) -> anyhow::Result<()> {
    let api_key = config
        .api
        .api_key
        .as_deref()
        .ok_or_else(|| anyhow!("An API key is required (--api-key or SOFTESCROW_API_KEY)"))?;

    tracing::debug!(base_url = %config.api.base_url, "Using SoftEscrow API");

    let api = HttpEscrowApi::new(&config.api.base_url, api_key, config.api.timeout())
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;
    let uploader = Uploader::new(Arc::new(api), config.upload.concurrency);

    let request = UploadRequest::new(args.container_id, args.filepath).with_part_size(args.part_size);
    let confirmation = uploader.upload_file(&request).await?;

    println!(
        "Your file has been uploaded successfully. Please visit the following URL to retrieve your deposit certificate:\n{}",
        confirmation
    );
    Ok(())
}
