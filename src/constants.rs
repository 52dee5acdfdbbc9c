// src/constants.rs

pub const DEFAULT_CONFIG_PATH: &str = "/etc/gitftpd.conf";
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 8021;

/// Tried in order when opening the served revision.
pub const DEFAULT_REVISIONS: [&str; 3] = ["main", "master", "HEAD"];

pub const SHORT_ID_LEN: usize = 7;
pub const DEFAULT_DATA_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_DOWNLOAD_BUFFER_SIZE: usize = 128 * 1024;

// Owner and group shown in directory listings
pub const LIST_OWNER: &str = "git";
pub const LIST_GROUP: &str = "git";

/// Longest accepted control line, line ending included: a PATH_MAX argument
/// plus room for the keyword.
pub const MAX_COMMAND_LINE: usize = 4096 + 10;
