//! Optional TOML configuration file.
//!
//! Every key is optional; anything left out keeps the built-in value.
//!
//! ```toml
//! port = 22
//! timeout_secs = 15
//! connect_timeout_secs = 20
//! reserved_slots = [5, 6]
//! max_escalation_attempts = 3
//! host_key_verification = "accept-new"
//!
//! [table]
//! in_service = "INSERVICE"
//!
//! [log]
//! file = "connection_log.log"
//! keep_existing = false
//!
//! [[catalog]]
//! name = "enter_config_mode"
//! command = "configure terminal"
//! expect = '\(config\)#'
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::catalog::CommandCatalog;
use crate::error::ConfigError;
use crate::logging::{DEFAULT_BACKUPS, DEFAULT_MAX_BYTES, RunLog};
use crate::provision::{DEFAULT_RESERVED_SLOTS, DEFAULT_STATUS_COMMAND};
use crate::session::SessionOptions;
use crate::table::TableLayout;
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT, HostKeyVerification};

/// Default run log location.
pub const DEFAULT_LOG_FILE: &str = "connection_log.log";

/// Run log settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Active log file.
    pub file: PathBuf,

    /// Rotate once the file would exceed this size.
    pub max_bytes: u64,

    /// Rotated files to keep.
    pub backups: usize,

    /// Append to a log left by a previous run instead of removing it.
    pub keep_existing: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_LOG_FILE),
            max_bytes: DEFAULT_MAX_BYTES,
            backups: DEFAULT_BACKUPS,
            keep_existing: false,
        }
    }
}

impl LogSettings {
    /// Open the run log these settings describe.
    pub fn open(&self) -> Result<RunLog, ConfigError> {
        RunLog::open_file(&self.file, self.max_bytes, self.backups, self.keep_existing)
    }
}

/// Application settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SSH port.
    pub port: u16,

    /// Seconds to wait for an expected response.
    pub timeout_secs: u64,

    /// Seconds to wait for the connection to come up.
    pub connect_timeout_secs: u64,

    /// Host key policy.
    pub host_key_verification: HostKeyVerification,

    /// known_hosts file used by the strict and accept-new policies.
    pub known_hosts_path: Option<PathBuf>,

    /// Give up after this many failed escalations; unset asks forever.
    pub max_escalation_attempts: Option<u32>,

    /// Slots that never receive commands.
    pub reserved_slots: Vec<u32>,

    /// Command that prints the card status table.
    pub status_command: String,

    /// Status table layout.
    pub table: TableLayout,

    /// Command catalog.
    pub catalog: CommandCatalog,

    /// Run log settings.
    pub log: LogSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 22,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            max_escalation_attempts: None,
            reserved_slots: DEFAULT_RESERVED_SLOTS.to_vec(),
            status_command: DEFAULT_STATUS_COMMAND.to_string(),
            table: TableLayout::default(),
            catalog: CommandCatalog::default(),
            log: LogSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse TOML text.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Session settings derived from this configuration.
    pub fn session_options(&self) -> SessionOptions {
        let mut ssh = SessionOptions::default().ssh;
        ssh.port = self.port;
        ssh.timeout = Duration::from_secs(self.timeout_secs);
        ssh.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        ssh.host_key_verification = self.host_key_verification;
        ssh.known_hosts_path = self.known_hosts_path.clone();

        SessionOptions {
            ssh,
            max_escalation_attempts: self.max_escalation_attempts,
        }
    }
}
