//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use regex::bytes::Regex;
use russh::client::{self, Handle};
use russh::keys::PublicKey;
use secrecy::ExposeSecret;

use super::config::{HostKeyVerification, SshConfig};
use super::{Connector, Transport};
use crate::channel::PtyChannel;
use crate::error::{Result, TransportError};

/// Opens [`SshTransport`]s. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    type Transport = SshTransport;

    async fn open(&self, config: &SshConfig) -> Result<SshTransport> {
        SshTransport::connect(config).await
    }
}

/// SSH transport wrapping a russh client and one PTY shell channel.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// Interactive shell channel.
    channel: PtyChannel,
}

impl SshTransport {
    /// Connect to the SSH server, authenticate and open a shell.
    pub async fn connect(config: &SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config::default());

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification,
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("Connecting to {}", config.socket_addr());

        let mut session = tokio::time::timeout(
            config.connect_timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.connect_timeout))?
        .map_err(|e| {
            // Prefer the detailed host-key error over russh's generic UnknownKey
            let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
            stored.unwrap_or(TransportError::Ssh(e))
        })?;

        Self::authenticate(&mut session, config).await?;

        let channel = Self::open_shell(&session, config).await?;

        Ok(Self { session, channel })
    }

    /// Open a PTY shell channel on this connection.
    async fn open_shell(session: &Handle<SshHandler>, config: &SshConfig) -> Result<PtyChannel> {
        let channel = session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "xterm",
                config.terminal_width,
                config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        Ok(PtyChannel::new(channel))
    }

    /// Password authentication.
    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        let success = session
            .authenticate_password(&config.username, config.password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?
            .success();

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }
}

impl Transport for SshTransport {
    async fn write(&mut self, text: &str) -> Result<()> {
        self.channel.send(text).await
    }

    async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> Result<String> {
        let data = self.channel.read_until_pattern(pattern, timeout).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.channel.close().await {
            debug!("Channel close failed: {}", e);
        }
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Detailed host-key error for connect() to surface.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
