use crate::config::Config;
use crate::constants::MAX_COMMAND_LINE;
use crate::core_ftpcommand::ftpcommand::{parse_command_line, trim_line_ending, FtpCommand};
use crate::core_ftpcommand::handlers::initialize_command_handlers;
use crate::core_network::pasv::passive_ip;
use crate::core_tree::{GitTree, TreeError};
use crate::helpers::{send_response, ControlWriter};
use crate::session::Session;
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

pub async fn start_server(config: Arc<Config>) -> Result<()> {
    let address = format!(
        "{}:{}",
        config.server.listen_address, config.server.listen_port
    );
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind control port {}", address))?;
    info!("Server listening on {}", address);

    serve(listener, config).await
}

/// Accepts control connections until a shutdown signal arrives.
///
/// Each connection runs as its own task with its own view of the
/// repository. The `JoinSet` is the registry of live sessions: finished ones
/// are reaped as they complete, the rest are aborted on shutdown.
pub async fn serve(listener: TcpListener, config: Arc<Config>) -> Result<()> {
    let mut sessions = JoinSet::new();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((socket, addr)) => {
                    info!("New connection from {}", addr);
                    let config = Arc::clone(&config);
                    sessions.spawn(async move {
                        if let Err(e) = handle_connection(socket, config).await {
                            warn!("Connection error for {}: {:?}", addr, e);
                        }
                        info!("Connection closed for {}", addr);
                    });
                }
                Err(e) => {
                    // Usually descriptor exhaustion; give sessions a moment to finish
                    warn!("Failed to accept control connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            },
            Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                if let Err(e) = finished {
                    error!("Session task failed: {}", e);
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down, aborting {} live session(s)", sessions.len());
                sessions.shutdown().await;
                return Ok(());
            }
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = wait_for_ctrl_c() => {}
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await;
    }
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn open_session(config: &Config, local_ip: Option<Ipv4Addr>) -> Result<Session, TreeError> {
    let tree = GitTree::open(
        config.repository.path.clone().unwrap_or_default(),
        &config.repository.revisions,
        config.repository.tree_options(),
    )?;
    Ok(Session::new(tree, local_ip))
}

/// Runs one control connection from greeting to QUIT or disconnect.
///
/// A repository that cannot be opened is reported with `451` and ends the
/// connection before any command is read.
pub async fn handle_connection(socket: TcpStream, config: Arc<Config>) -> Result<()> {
    let local_ip = passive_ip(socket.local_addr()?.ip());
    let (read_half, write_half) = socket.into_split();
    let writer: ControlWriter = Arc::new(Mutex::new(write_half));
    let mut reader = BufReader::new(read_half);

    let session = match open_session(&config, local_ip) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to open repository for session: {}", e);
            send_response(&writer, e.to_ftp_response().as_bytes()).await?;
            return Ok(());
        }
    };
    let greeting = format!("220 Browsing at SHA ({})\r\n", session.revision_short_id());
    let session = Arc::new(Mutex::new(session));
    send_response(&writer, greeting.as_bytes()).await?;

    let handlers = initialize_command_handlers();
    let idle_timeout = config.server.idle_timeout();
    let mut line = Vec::new();

    loop {
        let read = match idle_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, read_control_line(&mut reader, &mut line)).await {
                    Ok(read) => read?,
                    Err(_) => {
                        info!("Closing control connection idle for {}s", limit.as_secs());
                        send_response(
                            &writer,
                            b"421 Idle timeout, closing control connection\r\n",
                        )
                        .await?;
                        break;
                    }
                }
            }
            None => read_control_line(&mut reader, &mut line).await?,
        };

        match read {
            ControlLine::Eof => {
                info!("Client disconnected");
                break;
            }
            ControlLine::TooLong => {
                warn!("Discarded control line longer than {} bytes", MAX_COMMAND_LINE);
                send_response(&writer, b"500 Command line too long\r\n").await?;
                continue;
            }
            ControlLine::Line => {}
        }

        let command_line = trim_line_ending(&line);
        let (keyword, arg) = parse_command_line(command_line);
        if keyword == b"PASS" {
            info!("Received command: PASS ****");
        } else {
            info!("Received command: {}", String::from_utf8_lossy(command_line));
        }

        let command = FtpCommand::from_bytes(keyword);
        match command.and_then(|command| handlers.get(&command)) {
            Some(handler) => {
                handler(
                    Arc::clone(&writer),
                    Arc::clone(&config),
                    Arc::clone(&session),
                    arg.to_vec(),
                )
                .await?
            }
            None => {
                debug!("Unimplemented command: {}", String::from_utf8_lossy(keyword));
                send_response(&writer, b"502 Unimplemented\r\n").await?;
            }
        }

        if command == Some(FtpCommand::QUIT) {
            break;
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ControlLine {
    Line,
    TooLong,
    Eof,
}

/// Reads one control line into `line`, never buffering more than
/// `MAX_COMMAND_LINE` bytes. An over-long line is consumed up to its `\n`
/// and reported as `TooLong`; a final line without `\n` still counts.
async fn read_control_line<R>(reader: &mut R, line: &mut Vec<u8>) -> std::io::Result<ControlLine>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let limit = MAX_COMMAND_LINE as u64;
    let n = (&mut *reader).take(limit).read_until(b'\n', line).await?;
    if n == 0 {
        return Ok(ControlLine::Eof);
    }
    if line.last() == Some(&b'\n') || n < MAX_COMMAND_LINE {
        return Ok(ControlLine::Line);
    }

    loop {
        line.clear();
        let n = (&mut *reader).take(limit).read_until(b'\n', line).await?;
        if n == 0 || line.last() == Some(&b'\n') {
            break;
        }
    }
    line.clear();
    Ok(ControlLine::TooLong)
}
