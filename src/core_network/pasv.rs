use crate::config::Config;
use crate::helpers::{send_response, ControlWriter};
use crate::session::Session;
use log::{debug, error, info, warn};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

/// A passive-mode listener waiting for exactly one data connection.
#[derive(Debug)]
pub struct PassiveListener {
    listener: TcpListener,
    announced: SocketAddrV4,
}

impl PassiveListener {
    /// Binds an ephemeral port on `bind_ip`; the reply advertises
    /// `announce_ip` with that port.
    pub async fn open(bind_ip: Ipv4Addr, announce_ip: Ipv4Addr) -> io::Result<Self> {
        let listener = TcpListener::bind((bind_ip, 0)).await?;
        let port = listener.local_addr()?.port();
        let announced = SocketAddrV4::new(announce_ip, port);
        debug!("PASV listener bound on {}:{}, announced as {}", bind_ip, port, announced);
        Ok(Self { listener, announced })
    }

    pub fn announced(&self) -> SocketAddrV4 {
        self.announced
    }

    /// The `(h1,h2,h3,h4,p1,p2)` token for the 227 reply.
    pub fn token(&self) -> String {
        encode_pasv_address(*self.announced.ip(), self.announced.port())
    }

    /// Accepts the data connection, consuming the listener whatever the outcome.
    pub async fn accept(self, limit: Option<Duration>) -> io::Result<TcpStream> {
        let accepted = match limit {
            Some(limit) => tokio::time::timeout(limit, self.listener.accept())
                .await
                .map_err(|_| {
                    io::Error::new(io::ErrorKind::TimedOut, "no data connection before timeout")
                })?,
            None => self.listener.accept().await,
        };
        let (data_stream, addr) = accepted?;
        debug!("Accepted data connection from: {}", addr);
        Ok(data_stream)
    }
}

/// Encodes an IPv4 address and port as the passive-mode token, port high
/// byte first.
pub fn encode_pasv_address(ip: Ipv4Addr, port: u16) -> String {
    let [a, b, c, d] = ip.octets();
    format!("({},{},{},{},{},{})", a, b, c, d, port >> 8, port & 0xff)
}

/// Picks the address to announce: the configured override if any, else
/// the local address of the control connection.
fn announce_address(config: &Config, local_ip: Ipv4Addr) -> io::Result<Ipv4Addr> {
    match &config.server.pasv_address {
        Some(address) => address
            .parse::<Ipv4Addr>()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e)),
        None => Ok(local_ip),
    }
}

/// Maps the control connection's local address onto the IPv4 address PASV
/// can describe.
pub fn passive_ip(local: IpAddr) -> Option<Ipv4Addr> {
    match local {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(ip) => ip.to_ipv4_mapped(),
    }
}

/// Sets up a passive mode (PASV) listener and sends the response to the client.
///
/// A listener left over from an earlier PASV is closed when the new one
/// replaces it.
pub async fn handle_pasv_command(
    writer: ControlWriter,
    config: Arc<Config>,
    session: Arc<Mutex<Session>>,
    _arg: Vec<u8>,
) -> Result<(), io::Error> {
    let mut session = session.lock().await;

    let bind_ip = match session.local_ip {
        Some(ip) => ip,
        None => {
            warn!("PASV requested on a non-IPv4 control connection");
            send_response(&writer, b"452 Passive mode requires IPv4\r\n").await?;
            return Ok(());
        }
    };

    let announce_ip = match announce_address(&config, bind_ip) {
        Ok(ip) => ip,
        Err(e) => {
            error!("Invalid pasv_address in configuration: {}", e);
            send_response(&writer, b"452 Passive socket incorrect\r\n").await?;
            return Ok(());
        }
    };

    let listener = match PassiveListener::open(bind_ip, announce_ip).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to open passive listener: {}", e);
            send_response(&writer, b"452 Passive mode port unavailable\r\n").await?;
            return Ok(());
        }
    };

    let response = format!("227 Entering Passive Mode {}\r\n", listener.token());
    if let Some(previous) = session.pasv.replace(listener) {
        debug!("Abandoning unused passive listener on {}", previous.announced());
    }
    info!("Opening passive socket on {}", response.trim_end());

    send_response(&writer, response.as_bytes()).await
}
