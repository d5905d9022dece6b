//! Error types for ferrolt.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for ferrolt operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session-level errors (escalation, lifecycle)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Command catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Operator input errors
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Configuration file errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Login rejected by the device
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key does not match the one in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host is not in known_hosts and strict checking is on
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Expected pattern was not seen in time
    #[error("Pattern '{pattern}' not found within {timeout:?}")]
    PatternTimeout { pattern: String, timeout: Duration },

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Session errors (lifecycle and privilege escalation).
#[derive(Error, Debug)]
pub enum SessionError {
    /// No transport is open
    #[error("Session not connected - call connect() first")]
    NotConnected,

    /// A transport is already open
    #[error("Session already connected")]
    AlreadyConnected,

    /// Privileged mode was not reached
    #[error("Failed to acquire privilege level '{target}': {reason}")]
    EscalationFailed { target: String, reason: String },

    /// Escalation retries ran out
    #[error("Giving up on privilege escalation after {attempts} attempts")]
    EscalationExhausted { attempts: u32 },

    /// Operator cancelled a prompt
    #[error("Cancelled by operator")]
    Cancelled,

    /// Unknown privilege level detected
    #[error("Unknown privilege level from prompt: '{prompt}'")]
    UnknownPrivilege { prompt: String },

    /// No path found between privilege levels
    #[error("No path from privilege '{from}' to '{to}'")]
    NoPrivilegePath { from: String, to: String },
}

/// Command catalog errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Template references a placeholder that has no value
    #[error("Unknown placeholder '{{{name}}}' in template '{template}'")]
    UnknownPlaceholder { name: String, template: String },

    /// Template has an unterminated `{`
    #[error("Unterminated placeholder in template '{template}'")]
    Unterminated { template: String },

    /// A required catalog entry is missing
    #[error("Catalog has no entry named '{name}'")]
    MissingEntry { name: String },

    /// Rendered expect pattern is not a valid regex
    #[error("Invalid expect pattern for '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Operator input errors.
#[derive(Error, Debug)]
pub enum InputError {
    /// Address is not a dotted quad
    #[error("Invalid IP address format: '{0}'")]
    InvalidAddress(String),

    /// Address did not answer the reachability probe
    #[error("Address {0} is not reachable")]
    Unreachable(String),

    /// Empty value for a required field
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Console prompt failed
    #[error("Prompt failed: {0}")]
    Prompt(String),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Log file could not be opened
    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type alias using ferrolt's Error.
pub type Result<T> = std::result::Result<T, Error>;
