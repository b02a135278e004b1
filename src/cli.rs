use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fitslake")]
#[command(about = "Extract FITS headers from object storage into CSV", long_about = None)]
pub struct Cli {
    /// TOML configuration file (defaults to $FITSLAKE_CONFIG or config/fitslake.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run as the storage-notification function (Lambda runtime loop)
    Serve,
    /// Print the CSV rows for a local FITS file
    Extract(ExtractArgs),
    /// Run a recorded notification payload through the handler
    Replay(ReplayArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct ExtractArgs {
    /// FITS file to read
    pub path: PathBuf,

    /// Value for the source_bucket column
    #[arg(long, default_value = "local")]
    pub bucket: String,

    /// Value for the source_key column (defaults to the file name)
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ReplayArgs {
    /// JSON file holding an S3 notification payload ({"Records": [...]})
    pub event: PathBuf,

    /// Local FITS file to stage as the source of every creation record
    /// before replaying (useful with the in-memory provider)
    #[arg(long)]
    pub object: Option<PathBuf>,
}
