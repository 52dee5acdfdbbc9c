use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "gitftpd",
    version,
    about = "Serves one revision of a git repository over read-only FTP."
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Control port to listen on, overriding the configuration file
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Revision to serve; repeat to give fallbacks, first match wins
    #[arg(short, long = "revision", value_name = "REVISION")]
    pub revisions: Vec<String>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,

    /// Repository to serve, overriding the configuration file
    pub repository: Option<PathBuf>,
}
