use crate::config::Config;
use crate::helpers::{send_response, ControlWriter};
use crate::session::Session;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handles the CWD (Change Working Directory) FTP command.
///
/// The argument is resolved against the current virtual path; `..` never
/// climbs above the root. The session only moves when the target is a
/// directory of the served revision.
pub async fn handle_cwd_command(
    writer: ControlWriter,
    _config: Arc<Config>,
    session: Arc<Mutex<Session>>,
    arg: Vec<u8>,
) -> Result<(), std::io::Error> {
    let mut session = session.lock().await;
    let new_path = session.current_path.join(&arg);

    match session.change_dir(new_path.clone()) {
        Ok(()) => {
            info!("Changed directory to {}", new_path);
            send_response(&writer, b"250 CWD command successful\r\n").await
        }
        Err(e) if e.is_not_found() => {
            warn!("CWD to missing directory {}: {}", new_path, e);
            let response = [
                b"550 ".as_slice(),
                new_path.to_bytes().as_slice(),
                b": No such directory\r\n".as_slice(),
            ]
            .concat();
            send_response(&writer, &response).await
        }
        Err(e) => {
            error!("Failed to resolve {}: {}", new_path, e);
            send_response(&writer, e.to_ftp_response().as_bytes()).await
        }
    }
}
