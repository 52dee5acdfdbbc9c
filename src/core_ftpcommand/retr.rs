use crate::config::Config;
use crate::core_network::handlers::{open_data_connection, send_data};
use crate::helpers::{send_response, ControlWriter};
use crate::session::Session;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handles the RETR (Retrieve) FTP command.
///
/// The data connection is accepted before the path is resolved, so a
/// missing file still uses up the pending PASV listener.
///
/// # Arguments
///
/// * `writer` - The control connection.
/// * `config` - A shared server configuration.
/// * `session` - The session whose current path `arg` is resolved against.
/// * `arg` - Path of the file to send, absolute or relative.
pub async fn handle_retr_command(
    writer: ControlWriter,
    config: Arc<Config>,
    session: Arc<Mutex<Session>>,
    arg: Vec<u8>,
) -> Result<(), std::io::Error> {
    let mut session = session.lock().await;

    let mut data_stream = match open_data_connection(&writer, &config, &mut session).await? {
        Some(data_stream) => data_stream,
        None => return Ok(()),
    };

    let path = session.current_path.join(&arg);
    let resolved = session.tree.resolve_file(&path);
    let file = match resolved {
        Ok(file) => file,
        Err(e) if e.is_not_found() => {
            warn!("RETR of missing file {}: {}", path, e);
            let response = [
                b"550 ".as_slice(),
                path.to_bytes().as_slice(),
                b": No such file\r\n".as_slice(),
            ]
            .concat();
            send_response(&writer, &response).await?;
            return Ok(());
        }
        Err(e) => {
            error!("Failed to resolve {}: {}", path, e);
            send_response(&writer, e.to_ftp_response().as_bytes()).await?;
            return Ok(());
        }
    };

    debug!(
        "Reading {} ({} bytes stored{})",
        path,
        file.size,
        if file.executable { ", executable" } else { "" }
    );
    let read = session.tree.read(&file, &path);
    let content = match read {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to read {}: {}", path, e);
            send_response(&writer, e.to_ftp_response().as_bytes()).await?;
            return Ok(());
        }
    };

    let response = [
        b"150 Opening BINARY mode data connection for ".as_slice(),
        arg.as_slice(),
        format!(" ({} bytes)\r\n", content.len()).as_bytes(),
    ]
    .concat();
    send_response(&writer, &response).await?;
    info!("Sending file: {}", path);

    match send_data(
        &mut data_stream,
        &content,
        config.server.download_buffer_size(),
    )
    .await
    {
        Ok(()) => {
            info!("File transfer completed successfully: {}", path);
            send_response(&writer, b"226 Transfer complete\r\n").await
        }
        Err(e) => {
            error!("Error sending file to client: {}", e);
            send_response(&writer, b"426 Transfer error\r\n").await
        }
    }
}
