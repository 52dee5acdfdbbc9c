use crate::constants::{
    DEFAULT_DATA_TIMEOUT_SECS, DEFAULT_DOWNLOAD_BUFFER_SIZE, DEFAULT_LISTEN_ADDRESS,
    DEFAULT_LISTEN_PORT, DEFAULT_REVISIONS,
};
use crate::core_tree::TreeOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_address: String,
    pub listen_port: u16,
    pub pasv_address: Option<String>, // Announced in PASV replies instead of the local address
    pub data_timeout_secs: Option<u64>, // 0 waits forever for the data connection
    pub idle_timeout_secs: Option<u64>, // 0 or unset disables the control idle timeout
    pub download_buffer_size: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub path: Option<PathBuf>,
    pub revisions: Vec<String>,
    pub text_filters: bool,
    pub last_modified_lookup: bool,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub repository: RepositoryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: String::from(DEFAULT_LISTEN_ADDRESS),
            listen_port: DEFAULT_LISTEN_PORT,
            pasv_address: None,
            data_timeout_secs: Some(DEFAULT_DATA_TIMEOUT_SECS),
            idle_timeout_secs: None,
            download_buffer_size: Some(DEFAULT_DOWNLOAD_BUFFER_SIZE),
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            revisions: DEFAULT_REVISIONS.iter().map(|r| r.to_string()).collect(),
            text_filters: true,
            last_modified_lookup: true,
        }
    }
}

impl ServerConfig {
    pub fn data_timeout(&self) -> Option<Duration> {
        match self.data_timeout_secs {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }

    pub fn download_buffer_size(&self) -> usize {
        match self.download_buffer_size {
            Some(0) | None => DEFAULT_DOWNLOAD_BUFFER_SIZE,
            Some(size) => size,
        }
    }
}

impl RepositoryConfig {
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            text_filters: self.text_filters,
            last_modified_lookup: self.last_modified_lookup,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path))?;
        Self::parse(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path))
    }

    pub fn parse(config_str: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(config_str)?;

        if config.repository.revisions.is_empty() {
            config.repository.revisions = RepositoryConfig::default().revisions;
        }

        Ok(config)
    }
}
