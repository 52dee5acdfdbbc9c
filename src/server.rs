use crate::config::Config;
use crate::core_network::network;
use crate::helpers::log_config;
use anyhow::Result;
use log::{error, info};
use std::sync::Arc;

/// Runs the FTP server with the provided configuration.
///
/// Returns once a shutdown signal has been handled, or with the error that
/// kept the control port from opening.
pub async fn run(config: Config) -> Result<()> {
    info!("Starting server with configuration:");
    log_config(&config);

    match network::start_server(Arc::new(config)).await {
        Ok(()) => {
            info!("Server stopped.");
            Ok(())
        }
        Err(e) => {
            error!("Failed to start server: {:#}", e);
            Err(e)
        }
    }
}
