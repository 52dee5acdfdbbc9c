use crate::config::Config;
use crate::core_ftpcommand::utils::format_listing;
use crate::core_network::handlers::{open_data_connection, send_data};
use crate::helpers::{send_response, ControlWriter};
use crate::session::Session;
use chrono::Local;
use log::{error, info};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handles the LIST FTP command.
///
/// Lists the current directory (never recursively) over the pending passive
/// data connection. Any argument is ignored.
pub async fn handle_list_command(
    writer: ControlWriter,
    config: Arc<Config>,
    session: Arc<Mutex<Session>>,
    _arg: Vec<u8>,
) -> Result<(), std::io::Error> {
    let mut session = session.lock().await;

    let mut data_stream = match open_data_connection(&writer, &config, &mut session).await? {
        Some(data_stream) => data_stream,
        None => return Ok(()),
    };

    let dir = session.current_dir;
    let path = session.current_path.clone();
    let entries = match session.tree.list(dir, &path) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Failed to list {}: {}", path, e);
            send_response(&writer, e.to_ftp_response().as_bytes()).await?;
            return Ok(());
        }
    };
    let listing = format_listing(&entries, &Local::now());

    send_response(
        &writer,
        b"150 Opening ASCII mode data connection for file list\r\n",
    )
    .await?;

    match send_data(
        &mut data_stream,
        &listing,
        config.server.download_buffer_size(),
    )
    .await
    {
        Ok(()) => {
            info!("Directory listing of {} sent ({} entries)", path, entries.len());
            send_response(&writer, b"226 Transfer complete\r\n").await
        }
        Err(e) => {
            error!("Failed to send directory listing: {}", e);
            send_response(&writer, b"426 Connection closed; transfer aborted\r\n").await
        }
    }
}
