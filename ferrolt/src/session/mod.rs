//! Device session lifecycle.
//!
//! [`SessionManager`] owns the only transport to the device. It logs in,
//! escalates to the platform's default privilege level (asking the operator
//! for a new secret until escalation works), sends commands that wait for a
//! specific response pattern, and tears the session down.

mod privilege;
mod response;

pub use privilege::{PrivilegeManager, Transition};
pub use response::Response;

use std::time::Instant;

use log::debug;
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use crate::channel::any_of;
use crate::credentials::Credentials;
use crate::error::{ChannelError, InputError, Result, SessionError};
use crate::logging::RunLog;
use crate::platform::PlatformDefinition;
use crate::transport::{Connector, SshConfig, Transport};
use response::last_line;

/// Lifecycle of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport yet, or dropped after a failed escalation.
    Disconnected,
    /// Logged in, not yet privileged.
    Connected,
    /// At the platform's default privilege level (or deeper).
    Privileged,
    /// Torn down by [`SessionManager::disconnect`].
    Closed,
}

/// Source of a replacement privileged secret after escalation fails.
pub trait SecretPrompt {
    /// A new secret, or `None` if the operator gave up.
    fn new_secret(&mut self) -> Option<SecretString>;
}

impl<F> SecretPrompt for F
where
    F: FnMut() -> Option<SecretString>,
{
    fn new_secret(&mut self) -> Option<SecretString> {
        self()
    }
}

/// Connection settings that are not credentials.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Port, timeouts and host-key policy; host and login are filled in
    /// from [`Credentials`].
    pub ssh: SshConfig,

    /// Stop asking for a new secret after this many failed escalations.
    /// `None` keeps asking until the operator cancels.
    pub max_escalation_attempts: Option<u32>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ssh: SshConfig::new("", "", SecretString::from("")),
            max_escalation_attempts: None,
        }
    }
}

/// Owns the device session.
pub struct SessionManager<C: Connector> {
    connector: C,
    platform: PlatformDefinition,
    options: SessionOptions,
    privileges: PrivilegeManager,
    prompt_pattern: Regex,
    transport: Option<C::Transport>,
    state: SessionState,
    log: RunLog,
}

impl<C: Connector> SessionManager<C> {
    /// Create a disconnected session manager.
    pub fn new(
        connector: C,
        platform: PlatformDefinition,
        options: SessionOptions,
        log: RunLog,
    ) -> Result<Self> {
        let prompt_pattern = platform.prompt_pattern().map_err(ChannelError::from)?;
        let privileges = PrivilegeManager::new(platform.privilege_levels.clone());

        Ok(Self {
            connector,
            platform,
            options,
            privileges,
            prompt_pattern,
            transport: None,
            state: SessionState::Disconnected,
            log,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Name of the current privilege level, if known.
    pub fn current_privilege(&self) -> Option<&str> {
        self.privileges.current()
    }

    /// Check if a transport is open.
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Log in and escalate to privileged mode.
    ///
    /// Failure to open the transport is returned as-is. Escalation failures
    /// close the transport, log one error, ask `prompt` for a new secret,
    /// store it in `credentials` and start over. Nothing is opened while a
    /// credential field is empty.
    pub async fn connect(
        &mut self,
        credentials: &mut Credentials,
        prompt: &mut impl SecretPrompt,
    ) -> Result<()> {
        if self.transport.is_some() {
            return Err(SessionError::AlreadyConnected.into());
        }
        if let Some(field) = credentials.missing_field() {
            return Err(InputError::Empty { field }.into());
        }

        self.log.info(format!(
            "Connecting to device {} with username {}",
            credentials.address(),
            credentials.username()
        ));

        let mut attempts = 0u32;
        loop {
            attempts += 1;

            let config = credentials.ssh_config(&self.options.ssh);
            let transport = self.connector.open(&config).await?;
            self.transport = Some(transport);
            self.state = SessionState::Connected;
            self.log.info("Connection successful!");

            match self.escalate(credentials.secret()).await {
                Ok(()) => {
                    self.state = SessionState::Privileged;
                    self.log.info("Connection enable mode successful!");
                    return Ok(());
                }
                Err(e) => {
                    self.log.error(format!(
                        "Failed to authenticate. Please check your secret password. ({})",
                        e
                    ));
                    self.drop_transport().await;
                }
            }

            if let Some(max) = self.options.max_escalation_attempts {
                if attempts >= max {
                    return Err(SessionError::EscalationExhausted { attempts }.into());
                }
            }

            let secret = prompt.new_secret().ok_or(SessionError::Cancelled)?;
            if secret.expose_secret().is_empty() {
                return Err(InputError::Empty {
                    field: "Secret password",
                }
                .into());
            }
            credentials.replace_secret(secret);
        }
    }

    /// Re-enter enable mode from scratch so the secret is always checked,
    /// then run the platform's setup commands.
    async fn escalate(&mut self, secret: &SecretString) -> Result<()> {
        let prompt = self.read_prompt().await?;
        let current = self.privileges.update_from_prompt(&prompt)?;
        debug!("Initial privilege level: {}", current);

        let root = self
            .platform
            .root_privilege()
            .map(|level| level.name.clone())
            .unwrap_or_else(|| current.clone());
        let target = self.platform.default_privilege.clone();

        if current != root {
            self.acquire_privilege(&root, secret).await?;
        }
        self.acquire_privilege(&target, secret).await?;

        for command in self.platform.setup_commands.clone() {
            self.send_command_at_prompt(&command).await?;
        }

        Ok(())
    }

    /// Walk the privilege graph to `target`, answering password prompts
    /// with `secret`.
    pub async fn acquire_privilege(&mut self, target: &str, secret: &SecretString) -> Result<()> {
        let current = self
            .privileges
            .current()
            .map(str::to_string)
            .ok_or(SessionError::NotConnected)?;
        let path = self.privileges.find_path(&current, target)?;

        for step in path.windows(2) {
            let (from, to) = (&step[0], &step[1]);
            let transition = self.privileges.transition(from, to).ok_or_else(|| {
                SessionError::NoPrivilegePath {
                    from: from.clone(),
                    to: to.clone(),
                }
            })?;

            debug!("Privilege {} -> {} via '{}'", from, to, transition.command);
            let prompt = self.run_transition(&transition, secret).await?;

            let reached = self.privileges.update_from_prompt(&prompt)?;
            if reached != *to {
                return Err(SessionError::EscalationFailed {
                    target: to.clone(),
                    reason: format!("device stayed at '{}'", reached),
                }
                .into());
            }
        }

        Ok(())
    }

    async fn run_transition(&mut self, transition: &Transition, secret: &SecretString) -> Result<String> {
        let timeout = self.options.ssh.timeout;
        let transport = self.transport.as_mut().ok_or(SessionError::NotConnected)?;
        transport.write(&transition.command).await?;

        let Some(auth) = &transition.auth_prompt else {
            let output = transport.read_until(&self.prompt_pattern, timeout).await?;
            return Ok(last_line(&output).trim().to_string());
        };

        let auth_or_prompt = any_of([auth, &self.prompt_pattern]).map_err(ChannelError::from)?;
        let output = transport.read_until(&auth_or_prompt, timeout).await?;
        if !auth.is_match(last_line(&output).as_bytes()) {
            // No password asked for
            return Ok(last_line(&output).trim().to_string());
        }

        transport.write(secret.expose_secret()).await?;
        let output = transport.read_until(&auth_or_prompt, timeout).await?;
        let line = last_line(&output).trim().to_string();

        if auth.is_match(line.as_bytes()) {
            return Err(SessionError::EscalationFailed {
                target: transition.command.clone(),
                reason: "password rejected".to_string(),
            }
            .into());
        }

        Ok(line)
    }

    /// Wait for any known prompt and return it.
    async fn read_prompt(&mut self) -> Result<String> {
        let timeout = self.options.ssh.timeout;
        let transport = self.transport.as_mut().ok_or(SessionError::NotConnected)?;
        let output = transport.read_until(&self.prompt_pattern, timeout).await?;
        Ok(last_line(&output).trim().to_string())
    }

    /// Send `command` and wait until `expected` appears in the output.
    pub async fn send_command(&mut self, command: &str, expected: &Regex) -> Result<Response> {
        let timeout = self.options.ssh.timeout;
        let transport = self.transport.as_mut().ok_or(SessionError::NotConnected)?;

        let start = Instant::now();
        transport.write(command).await?;
        let raw = transport.read_until(expected, timeout).await?;

        let mut response = Response::new(command, raw, start.elapsed());

        if let Ok(level) = self.privileges.update_from_prompt(&response.prompt) {
            debug!("'{}' left the session at {}", command, level);
        }

        if let Some(failure) = self.platform.detect_failure(&response.result) {
            response = response.with_failure(failure);
        }

        Ok(response)
    }

    /// Send `command` and wait for any known prompt.
    pub async fn send_command_at_prompt(&mut self, command: &str) -> Result<Response> {
        let pattern = self.prompt_pattern.clone();
        self.send_command(command, &pattern).await
    }

    /// Close the session. Never fails; problems are logged.
    pub async fn disconnect(&mut self) {
        self.log.info("Exiting the device...");

        match self.transport.take() {
            Some(mut transport) => match transport.close().await {
                Ok(()) => self.log.info("Disconnected from the device."),
                Err(e) => self.log.error(format!("Error while exiting the device: {}", e)),
            },
            None => self.log.warn("No active connection to disconnect from."),
        }

        self.privileges.reset();
        self.state = SessionState::Closed;
    }

    /// Close a transport that failed escalation, without the teardown log.
    async fn drop_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("Close after failed escalation: {}", e);
            }
        }
        self.privileges.reset();
        self.state = SessionState::Disconnected;
    }
}
