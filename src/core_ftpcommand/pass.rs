use crate::config::Config;
use crate::helpers::{send_response, ControlWriter};
use std::sync::Arc;

pub async fn handle_pass_command(
    writer: ControlWriter,
    _config: Arc<Config>,
    _password: Vec<u8>,
) -> Result<(), std::io::Error> {
    send_response(&writer, b"230 Logged in\r\n").await
}
