use crate::config::Config;
use crate::helpers::{send_response, ControlWriter};
use crate::session::Session;
use log::{debug, error};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Takes the pending passive listener and accepts the data connection on it.
///
/// Returns `None` once the client has been told why there is no data
/// connection: `425` without a prior PASV, `452` when the accept fails. The
/// listener is gone either way.
pub async fn open_data_connection(
    writer: &ControlWriter,
    config: &Config,
    session: &mut Session,
) -> Result<Option<TcpStream>, std::io::Error> {
    let listener = match session.pasv.take() {
        Some(listener) => listener,
        None => {
            send_response(writer, b"425 Use PASV first\r\n").await?;
            return Ok(None);
        }
    };

    debug!("Waiting for data connection on {}", listener.announced());
    match listener.accept(config.server.data_timeout()).await {
        Ok(data_stream) => Ok(Some(data_stream)),
        Err(e) => {
            error!("Failed to accept data connection: {}", e);
            send_response(writer, b"452 Failed to accept passive connection\r\n").await?;
            Ok(None)
        }
    }
}

/// Writes `payload` to the data connection in `chunk_size` pieces, then
/// closes the sending side.
pub async fn send_data(
    data_stream: &mut TcpStream,
    payload: &[u8],
    chunk_size: usize,
) -> Result<(), std::io::Error> {
    for chunk in payload.chunks(chunk_size.max(1)) {
        data_stream.write_all(chunk).await?;
    }
    data_stream.flush().await?;
    data_stream.shutdown().await
}
