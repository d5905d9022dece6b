//! Transport layer: the blocking write / read-until-prompt primitive.
//!
//! The session layer only ever talks to a [`Transport`] obtained from a
//! [`Connector`]. The production pair is [`SshConnector`] / [`SshTransport`],
//! built on russh with a PTY shell channel.

pub mod config;
mod ssh;

use std::future::Future;
use std::time::Duration;

use regex::bytes::Regex;

use crate::error::Result;

pub use config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT, HostKeyVerification, SshConfig};
pub use ssh::{SshConnector, SshTransport};

/// An open interactive shell on one device.
pub trait Transport: Send {
    /// Write one line (a newline is appended).
    fn write(&mut self, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Read until `pattern` matches the tail of the output, returning
    /// everything captured since the previous read.
    fn read_until(
        &mut self,
        pattern: &Regex,
        timeout: Duration,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Close the shell and the underlying connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens transports from an [`SshConfig`].
pub trait Connector: Send + Sync {
    /// Transport produced by this connector.
    type Transport: Transport;

    /// Connect and log in.
    fn open(&self, config: &SshConfig) -> impl Future<Output = Result<Self::Transport>> + Send;
}
