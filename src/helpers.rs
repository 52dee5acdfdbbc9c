use crate::config::Config;
use log::info;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

/// Write half of a control connection, shared with the command handlers.
pub type ControlWriter = Arc<Mutex<OwnedWriteHalf>>;

/// Sends a response to the client.
pub async fn send_response(writer: &ControlWriter, message: &[u8]) -> Result<(), std::io::Error> {
    let mut writer = writer.lock().await;
    writer.write_all(message).await?;
    writer.flush().await?;
    Ok(())
}

// Helper function to log configuration options
pub fn log_config(config: &Config) {
    info!(
        "  Listen Address: {}:{}",
        config.server.listen_address, config.server.listen_port
    );
    info!(
        "  PASV Address: {}",
        config
            .server
            .pasv_address
            .as_deref()
            .unwrap_or("(control connection address)")
    );
    match config.server.data_timeout() {
        Some(timeout) => info!("  Data Connection Timeout: {}s", timeout.as_secs()),
        None => info!("  Data Connection Timeout: none"),
    }
    match config.server.idle_timeout() {
        Some(timeout) => info!("  Idle Timeout: {}s", timeout.as_secs()),
        None => info!("  Idle Timeout: none"),
    }
    info!(
        "  Download Buffer Size: {} KB",
        config.server.download_buffer_size() / 1024
    );
    if let Some(path) = &config.repository.path {
        info!("  Repository: {}", path.display());
    }
    info!("  Revisions: {}", config.repository.revisions.join(", "));
    info!("  Text Filters: {}", config.repository.text_filters);
    info!(
        "  Last-Modified Lookup: {}",
        config.repository.last_modified_lookup
    );
}
