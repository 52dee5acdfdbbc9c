use crate::helpers::{send_response, ControlWriter};
use log::debug;

/// Handles the TYPE FTP command.
///
/// Every representation type is acknowledged. Files always go out as the
/// tree stores them, whatever mode the client asked for.
pub async fn handle_type_command(writer: ControlWriter, arg: Vec<u8>) -> Result<(), std::io::Error> {
    debug!("TYPE {} acknowledged", String::from_utf8_lossy(&arg));
    send_response(&writer, b"200 Type accepted\r\n").await
}
