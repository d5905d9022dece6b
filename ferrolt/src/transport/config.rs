//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Operation timeout for reads that wait on a prompt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for establishing the TCP + SSH connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    AcceptNew,

    /// Accept all keys without checking. OLTs are commonly reinstalled
    /// and re-keyed in the field, so this is the default.
    #[default]
    Disabled,
}

/// SSH connection configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Login password.
    pub password: SecretString,

    /// Timeout applied to every prompt wait.
    pub timeout: Duration,

    /// Timeout for establishing the connection.
    pub connect_timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Create a config with the default timeouts and terminal size.
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            password,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
