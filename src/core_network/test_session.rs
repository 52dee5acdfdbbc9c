// End-to-end sessions over loopback against a fixture repository.

use crate::config::Config;
use crate::core_network::network::serve;
use crate::constants::MAX_COMMAND_LINE;
use crate::core_tree::test_fixture::{Fixture, BLOB, GUIDE, README};
use std::fs;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    /// One reply line as sent, line ending stripped.
    async fn raw_reply(&mut self) -> Vec<u8> {
        let mut line = Vec::new();
        self.reader.read_until(b'\n', &mut line).await.unwrap();
        assert!(line.ends_with(b"\r\n"), "unterminated reply: {:?}", line);
        line.truncate(line.len() - 2);
        line
    }

    async fn reply(&mut self) -> String {
        String::from_utf8_lossy(&self.raw_reply().await).into_owned()
    }

    async fn send_raw(&mut self, command: &[u8]) {
        self.writer.write_all(command).await.unwrap();
        self.writer.write_all(b"\r\n").await.unwrap();
    }

    async fn send(&mut self, command: &str) {
        self.send_raw(command.as_bytes()).await;
    }

    async fn raw_command(&mut self, command: &[u8]) -> Vec<u8> {
        self.send_raw(command).await;
        self.raw_reply().await
    }

    async fn command(&mut self, command: &str) -> String {
        self.send(command).await;
        self.reply().await
    }

    async fn at_eof(&mut self) -> bool {
        let mut rest = Vec::new();
        self.reader.read_to_end(&mut rest).await.unwrap() == 0
    }

    async fn pasv(&mut self) -> SocketAddrV4 {
        let reply = self.command("PASV").await;
        assert!(reply.starts_with("227 "), "unexpected reply: {}", reply);
        parse_pasv(&reply)
    }

    /// PASV, connect, send `command`, and collect whatever arrives on the
    /// data connection.
    async fn transfer(&mut self, command: &str) -> (String, Vec<u8>, String) {
        let (opening, payload, closing) = self.raw_transfer(command.as_bytes()).await;
        (String::from_utf8_lossy(&opening).into_owned(), payload, closing)
    }

    async fn raw_transfer(&mut self, command: &[u8]) -> (Vec<u8>, Vec<u8>, String) {
        let addr = self.pasv().await;
        let mut data = TcpStream::connect(addr).await.unwrap();
        let opening = self.raw_command(command).await;
        let mut payload = Vec::new();
        data.read_to_end(&mut payload).await.unwrap();
        let closing = self.reply().await;
        (opening, payload, closing)
    }
}

fn parse_pasv(reply: &str) -> SocketAddrV4 {
    let start = reply.find('(').unwrap() + 1;
    let end = reply.find(')').unwrap();
    let numbers: Vec<u8> = reply[start..end]
        .split(',')
        .map(|n| n.parse().unwrap())
        .collect();
    assert_eq!(numbers.len(), 6);
    SocketAddrV4::new(
        Ipv4Addr::new(numbers[0], numbers[1], numbers[2], numbers[3]),
        (u16::from(numbers[4]) << 8) | u16::from(numbers[5]),
    )
}

fn config_for(path: PathBuf) -> Config {
    let mut config = Config::default();
    config.repository.path = Some(path);
    config.server.data_timeout_secs = Some(5);
    config
}

async fn start(config: Config) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, Arc::new(config)));
    addr
}

/// Connects and consumes the greeting.
async fn login(fixture: &Fixture) -> Client {
    let addr = start(config_for(fixture.path().to_path_buf())).await;
    let mut client = Client::connect(addr).await;
    let greeting = client.reply().await;
    assert!(greeting.starts_with("220 "), "unexpected greeting: {}", greeting);
    client
}

fn listed_names(listing: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(listing)
        .split("\r\n")
        .filter(|line| !line.is_empty())
        .map(|line| line.split_whitespace().skip(8).collect::<Vec<_>>().join(" "))
        .collect()
}

#[tokio::test]
async fn test_greeting_names_revision() {
    let fixture = Fixture::new("main");
    let addr = start(config_for(fixture.path().to_path_buf())).await;
    let mut client = Client::connect(addr).await;

    let short = fixture.second.to_string()[..7].to_string();
    assert_eq!(client.reply().await, format!("220 Browsing at SHA ({})", short));
}

#[tokio::test]
async fn test_login_and_simple_commands() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    assert!(client.command("USER anonymous").await.starts_with("331 "));
    assert!(client.command("PASS secret").await.starts_with("230 "));
    assert_eq!(client.command("SYST").await, "215 UNIX Type: L8");
    assert!(client.command("TYPE I").await.starts_with("200 "));
    assert_eq!(client.command("PWD").await, "257 \"/\"");
}

#[tokio::test]
async fn test_unknown_commands_are_unimplemented() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    assert_eq!(client.command("STOR upload.txt").await, "502 Unimplemented");
    assert_eq!(client.command("pwd").await, "502 Unimplemented");
    assert_eq!(client.command("").await, "502 Unimplemented");
    // The session is still usable
    assert_eq!(client.command("PWD").await, "257 \"/\"");
}

#[tokio::test]
async fn test_list_without_pasv() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    assert_eq!(client.command("LIST").await, "425 Use PASV first");
}

#[tokio::test]
async fn test_list_root() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    let (opening, listing, closing) = client.transfer("LIST").await;
    assert!(opening.starts_with("150 "), "unexpected reply: {}", opening);
    assert_eq!(closing, "226 Transfer complete");
    assert_eq!(
        listed_names(&listing),
        vec!["README.md", "bin", "dir with space", "docs", "src"]
    );

    let text = String::from_utf8(listing).unwrap();
    assert!(text
        .lines()
        .any(|line| line.starts_with("drwxr-xr-x ") && line.ends_with(" src")));
}

#[tokio::test]
async fn test_list_consumes_passive_listener() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    client.transfer("LIST").await;
    assert_eq!(client.command("LIST").await, "425 Use PASV first");
}

#[tokio::test]
async fn test_retr_sends_blob() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    let (opening, content, closing) = client.transfer("RETR README.md").await;
    assert_eq!(
        opening,
        format!(
            "150 Opening BINARY mode data connection for README.md ({} bytes)",
            README.len()
        )
    );
    assert_eq!(content, README);
    assert_eq!(closing, "226 Transfer complete");
}

#[tokio::test]
async fn test_retr_missing_file() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    let addr = client.pasv().await;
    let _data = TcpStream::connect(addr).await.unwrap();
    assert_eq!(
        client.command("RETR nope.txt").await,
        "550 /nope.txt: No such file"
    );
    assert_eq!(client.command("LIST").await, "425 Use PASV first");
}

#[tokio::test]
async fn test_retr_directory_is_not_a_file() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    let addr = client.pasv().await;
    let _data = TcpStream::connect(addr).await.unwrap();
    assert_eq!(client.command("RETR src").await, "550 /src: No such file");
}

#[tokio::test]
async fn test_second_pasv_closes_first_listener() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    let first = client.pasv().await;
    let second = client.pasv().await;
    assert_ne!(first.port(), second.port());
    assert!(TcpStream::connect(first).await.is_err());

    let _data = TcpStream::connect(second).await.unwrap();
    client.send("LIST").await;
    assert!(client.reply().await.starts_with("150 "));
}

#[tokio::test]
async fn test_cwd_and_pwd() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    assert_eq!(client.command("CWD docs").await, "250 CWD command successful");
    assert_eq!(client.command("PWD").await, "257 \"/docs\"");

    assert!(client.command("CWD /dir with space").await.starts_with("250 "));
    assert_eq!(client.command("PWD").await, "257 \"/dir with space\"");

    assert!(client.command("CWD ../../src").await.starts_with("250 "));
    assert_eq!(client.command("PWD").await, "257 \"/src\"");

    let (_, listing, _) = client.transfer("LIST").await;
    assert_eq!(listed_names(&listing), vec!["lib.rs", "main.rs"]);

    assert!(client.command("CWD ..").await.starts_with("250 "));
    assert_eq!(client.command("PWD").await, "257 \"/\"");
}

#[tokio::test]
async fn test_cwd_to_missing_or_file_keeps_location() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    assert!(client.command("CWD src").await.starts_with("250 "));
    assert_eq!(
        client.command("CWD nowhere").await,
        "550 /src/nowhere: No such directory"
    );
    assert_eq!(
        client.command("CWD main.rs").await,
        "550 /src/main.rs: No such directory"
    );
    assert_eq!(client.command("PWD").await, "257 \"/src\"");
}

#[tokio::test]
async fn test_retr_relative_to_current_directory() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    assert!(client.command("CWD bin").await.starts_with("250 "));
    let (_, content, closing) = client.transfer("RETR run.sh").await;
    assert_eq!(content, crate::core_tree::test_fixture::RUN_SH);
    assert_eq!(closing, "226 Transfer complete");
}

#[tokio::test]
async fn test_data_connection_timeout() {
    let fixture = Fixture::new("main");
    let mut config = config_for(fixture.path().to_path_buf());
    config.server.data_timeout_secs = Some(1);
    let mut client = Client::connect(start(config).await).await;
    client.reply().await;

    client.pasv().await;
    assert_eq!(
        client.command("LIST").await,
        "452 Failed to accept passive connection"
    );
    assert_eq!(client.command("LIST").await, "425 Use PASV first");
}

#[tokio::test]
async fn test_unopenable_repository() {
    let empty = tempfile::TempDir::new().unwrap();
    let mut client = Client::connect(start(config_for(empty.path().to_path_buf())).await).await;

    assert!(client.reply().await.starts_with("451 "));
    assert!(client.at_eof().await);
}

#[tokio::test]
async fn test_missing_revision() {
    let fixture = Fixture::new("feature");
    let mut config = config_for(fixture.path().to_path_buf());
    config.repository.revisions = vec!["main".to_string()];
    let mut client = Client::connect(start(config).await).await;

    assert!(client.reply().await.starts_with("451 "));
    assert!(client.at_eof().await);
}

#[tokio::test]
async fn test_quit_closes_connection() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    assert_eq!(client.command("QUIT").await, "250 Bye");
    assert!(client.at_eof().await);
}

#[tokio::test]
async fn test_idle_timeout() {
    let fixture = Fixture::new("main");
    let mut config = config_for(fixture.path().to_path_buf());
    config.server.idle_timeout_secs = Some(1);
    let mut client = Client::connect(start(config).await).await;
    client.reply().await;

    assert!(client.reply().await.starts_with("421 "));
    assert!(client.at_eof().await);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let fixture = Fixture::new("main");
    let addr = start(config_for(fixture.path().to_path_buf())).await;
    let mut a = Client::connect(addr).await;
    let mut b = Client::connect(addr).await;
    a.reply().await;
    b.reply().await;

    assert!(a.command("CWD docs").await.starts_with("250 "));
    assert_eq!(b.command("PWD").await, "257 \"/\"");
    assert_eq!(a.command("PWD").await, "257 \"/docs\"");
}

#[tokio::test]
async fn test_retr_without_pasv() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    assert_eq!(client.command("RETR README.md").await, "425 Use PASV first");
    // Still usable afterwards
    let (_, content, _) = client.transfer("RETR README.md").await;
    assert_eq!(content, README);
}

#[tokio::test]
async fn test_names_that_are_not_utf8() {
    let fixture = Fixture::with_files(
        "main",
        &[
            (b"caf\xe9.txt".as_slice(), b"coffee\n".as_slice(), BLOB),
            (b"d\xff/inner.txt".as_slice(), b"inner\n".as_slice(), BLOB),
        ],
    );
    let mut client = login(&fixture).await;

    let (_, listing, _) = client.transfer("LIST").await;
    let lines: Vec<&[u8]> = listing
        .split(|&byte| byte == b'\n')
        .filter(|line| !line.is_empty())
        .collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(b" caf\xe9.txt\r"));
    assert!(lines[1].ends_with(b" d\xff\r"));

    let (opening, content, closing) = client.raw_transfer(b"RETR caf\xe9.txt").await;
    assert_eq!(
        opening,
        b"150 Opening BINARY mode data connection for caf\xe9.txt (7 bytes)".to_vec()
    );
    assert_eq!(content, b"coffee\n".to_vec());
    assert_eq!(closing, "226 Transfer complete");

    assert!(client
        .raw_command(b"CWD d\xff")
        .await
        .starts_with(b"250 "));
    assert_eq!(client.raw_command(b"PWD").await, b"257 \"/d\xff\"".to_vec());

    let (_, content, _) = client.transfer("RETR inner.txt").await;
    assert_eq!(content, b"inner\n".to_vec());

    let addr = client.pasv().await;
    let _data = TcpStream::connect(addr).await.unwrap();
    assert_eq!(
        client.raw_command(b"RETR /caf\xe8.txt").await,
        b"550 /caf\xe8.txt: No such file".to_vec()
    );
}

#[tokio::test]
async fn test_over_long_command_line() {
    let fixture = Fixture::new("main");
    let mut client = login(&fixture).await;

    let long = vec![b'A'; MAX_COMMAND_LINE * 3];
    assert_eq!(
        client.raw_command(&long).await,
        b"500 Command line too long".to_vec()
    );

    let mut retr = b"RETR ".to_vec();
    retr.extend(std::iter::repeat(b'x').take(MAX_COMMAND_LINE));
    assert_eq!(
        client.raw_command(&retr).await,
        b"500 Command line too long".to_vec()
    );

    assert_eq!(client.command("PWD").await, "257 \"/\"");
}

#[tokio::test]
async fn test_transfer_error_when_client_resets() {
    let big = vec![b'x'; 16 << 20];
    let fixture = Fixture::with_files("main", &[(b"big.bin".as_slice(), big.as_slice(), BLOB)]);
    let mut client = login(&fixture).await;

    let addr = client.pasv().await;
    let mut data = TcpStream::connect(addr).await.unwrap();
    assert!(client.command("RETR big.bin").await.starts_with("150 "));

    let mut first = [0u8; 1024];
    data.read_exact(&mut first).await.unwrap();
    // Closing with unread data pending resets the connection
    drop(data);

    assert_eq!(client.reply().await, "426 Transfer error");
    assert_eq!(client.command("PWD").await, "257 \"/\"");
}

#[tokio::test]
async fn test_retr_renders_line_endings_from_attributes() {
    let fixture = Fixture::new("main");
    fs::write(fixture.path().join(".gitattributes"), "*.txt eol=crlf\n").unwrap();
    let mut client = login(&fixture).await;

    let (opening, content, closing) = client.transfer("RETR docs/guide.txt").await;
    assert_eq!(content, b"step one\r\nstep two\r\n".to_vec());
    assert!(opening.ends_with(&format!("({} bytes)", content.len())));
    assert_eq!(closing, "226 Transfer complete");

    let (_, content, _) = client.transfer("RETR README.md").await;
    assert_eq!(content, README);
}

#[tokio::test]
async fn test_text_filters_can_be_disabled() {
    let fixture = Fixture::new("main");
    fs::write(fixture.path().join(".gitattributes"), "*.txt eol=crlf\n").unwrap();
    let mut config = config_for(fixture.path().to_path_buf());
    config.repository.text_filters = false;
    let mut client = Client::connect(start(config).await).await;
    client.reply().await;

    let (_, content, _) = client.transfer("RETR docs/guide.txt").await;
    assert_eq!(content, GUIDE);
}

#[tokio::test]
async fn test_pasv_needs_ipv4_control_connection() {
    let listener = match TcpListener::bind("[::1]:0").await {
        Ok(listener) => listener,
        // No IPv6 loopback on this host
        Err(_) => return,
    };
    let fixture = Fixture::new("main");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(
        listener,
        Arc::new(config_for(fixture.path().to_path_buf())),
    ));

    let mut client = Client::connect(addr).await;
    assert!(client.reply().await.starts_with("220 "));
    assert_eq!(client.command("PASV").await, "452 Passive mode requires IPv4");
    assert_eq!(client.command("LIST").await, "425 Use PASV first");
}
