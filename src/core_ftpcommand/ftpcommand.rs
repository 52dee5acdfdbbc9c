#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum FtpCommand {
    USER,
    PASS,
    PWD,
    CWD,
    TYPE,
    SYST,
    PASV,
    LIST,
    RETR,
    QUIT,
}

impl FtpCommand {
    /// Keywords are matched exactly; `pwd` is not `PWD`.
    pub fn from_str(cmd: &str) -> Option<FtpCommand> {
        match cmd {
            "USER" => Some(FtpCommand::USER),
            "PASS" => Some(FtpCommand::PASS),
            "PWD" => Some(FtpCommand::PWD),
            "CWD" => Some(FtpCommand::CWD),
            "TYPE" => Some(FtpCommand::TYPE),
            "SYST" => Some(FtpCommand::SYST),
            "PASV" => Some(FtpCommand::PASV),
            "LIST" => Some(FtpCommand::LIST),
            "RETR" => Some(FtpCommand::RETR),
            "QUIT" => Some(FtpCommand::QUIT),
            _ => None,
        }
    }

    /// A keyword that is not valid UTF-8 is never a command.
    pub fn from_bytes(keyword: &[u8]) -> Option<FtpCommand> {
        std::str::from_utf8(keyword)
            .ok()
            .and_then(FtpCommand::from_str)
    }
}

/// Splits a command line into its keyword and argument.
///
/// The argument is everything after the first space, inner and trailing
/// spaces included, since paths may contain them.
pub fn parse_command_line(line: &[u8]) -> (&[u8], &[u8]) {
    match line.iter().position(|&byte| byte == b' ') {
        Some(space) => (&line[..space], &line[space + 1..]),
        None => (line, &[]),
    }
}

/// Strips trailing `\r` and `\n` bytes; spaces are part of the argument.
pub fn trim_line_ending(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    &line[..end]
}
