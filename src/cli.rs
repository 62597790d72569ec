//! Command-line arguments

use std::num::NonZeroU64;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Deposit files with SoftEscrow.
#[derive(Debug, Parser)]
#[command(name = "softescrow", version, about)]
pub struct Cli {
    /// SoftEscrow API key (defaults to SOFTESCROW_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Alternative SoftEscrow Client Portal base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Number of parts uploaded at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a ZIP file to a Lincoln-Parry SoftEscrow Container
    Upload(UploadArgs),
}

#[derive(Debug, clap::Args)]
pub struct UploadArgs {
    /// SoftEscrow container ID
    #[arg(long)]
    pub container_id: String,

    /// Part size in bytes for multipart uploads
    #[arg(long)]
    pub part_size: Option<NonZeroU64>,

    /// File to upload
    pub filepath: PathBuf,
}
