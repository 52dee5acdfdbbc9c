use crate::config::Config;
use crate::helpers::{send_response, ControlWriter};
use crate::session::Session;
use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handles the USER FTP command.
///
/// Any username is accepted; the reply only asks for a password so that
/// clients proceed with their usual login sequence.
pub async fn handle_user_command(
    writer: ControlWriter,
    _config: Arc<Config>,
    _session: Arc<Mutex<Session>>,
    username: Vec<u8>,
) -> Result<(), std::io::Error> {
    info!(
        "Received USER command with username: {}",
        String::from_utf8_lossy(&username)
    );
    send_response(&writer, b"331 Username OK, supply any pass\r\n").await
}
