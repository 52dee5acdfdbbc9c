use crate::helpers::{send_response, ControlWriter};
use log::info;

/// Handles the QUIT FTP command.
///
/// Only the farewell is sent here; the command loop closes the connection
/// once this returns.
pub async fn handle_quit_command(writer: ControlWriter) -> Result<(), std::io::Error> {
    info!("Received QUIT command. Closing connection.");
    send_response(&writer, b"250 Bye\r\n").await
}
