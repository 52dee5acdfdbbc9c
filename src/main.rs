mod config;
mod constants;
mod core_cli;
mod core_ftpcommand;
mod core_network;
mod core_path;
mod core_tree;
mod helpers;
mod server;
mod session;

use crate::config::Config;
use crate::constants::DEFAULT_CONFIG_PATH;
use crate::core_cli::Cli;
use anyhow::{bail, Result};
use clap::Parser;
use colored::*;
use env_logger::{Builder, Env};
use log::{info, LevelFilter};
use std::io::Write;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize the logger with a custom format and colors
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder
        .format(|buf, record| {
            let timestamp = buf.timestamp().to_string();
            let level = match record.level() {
                log::Level::Error => record.level().to_string().red(),
                log::Level::Warn => record.level().to_string().yellow(),
                log::Level::Info => record.level().to_string().green(),
                log::Level::Debug => record.level().to_string().blue(),
                log::Level::Trace => record.level().to_string().white(),
            };
            writeln!(buf, "[{}] [{}] {}", timestamp, level, record.args())
        })
        .init();

    let config = load_config(&args)?;
    server::run(config).await
}

/// Reads the configuration file, if any, and applies the command-line
/// overrides on top of it.
fn load_config(args: &Cli) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Config::load_from_file(DEFAULT_CONFIG_PATH)?
        }
        None => {
            info!("No configuration file at {}, using defaults", DEFAULT_CONFIG_PATH);
            Config::default()
        }
    };

    if let Some(port) = args.port {
        config.server.listen_port = port;
    }
    if !args.revisions.is_empty() {
        config.repository.revisions = args.revisions.clone();
    }
    if let Some(repository) = &args.repository {
        config.repository.path = Some(repository.clone());
    }

    if config.repository.path.is_none() {
        bail!("No repository to serve: pass one on the command line or set repository.path");
    }

    Ok(config)
}
