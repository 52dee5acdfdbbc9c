// src/core_ftpcommand/pwd.rs
use crate::helpers::{send_response, ControlWriter};
use crate::session::Session;
use std::sync::Arc;
use tokio::sync::Mutex;

pub async fn handle_pwd_command(
    writer: ControlWriter,
    session: Arc<Mutex<Session>>,
) -> Result<(), std::io::Error> {
    let current_path = session.lock().await.current_path.to_bytes();
    send_response(&writer, &pwd_response(&current_path)).await
}

/// Quotes the path for a 257 reply, doubling any `"` inside it. Other bytes
/// are sent as they are.
pub fn pwd_response(path: &[u8]) -> Vec<u8> {
    let mut response = b"257 \"".to_vec();
    for &byte in path {
        if byte == b'"' {
            response.push(b'"');
        }
        response.push(byte);
    }
    response.extend_from_slice(b"\"\r\n");
    response
}
