//! Operator input: device address and credentials.
//!
//! Every prompt loops until it gets a usable value. Validation failures
//! are reported to the operator and never escape as errors; only a
//! cancelled or broken console does.

use std::future::Future;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use dialoguer::{Input, Password};
use log::{debug, warn};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

use crate::credentials::Credentials;
use crate::error::InputError;
use crate::session::SecretPrompt;

static DOTTED_QUAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").expect("dotted-quad pattern is valid")
});

/// Console access used by [`InputCollector`].
pub trait Prompter {
    /// Ask for a line of text. `Ok(None)` means the operator cancelled.
    fn input(&mut self, prompt: &str) -> Result<Option<String>, InputError>;

    /// Ask for a masked value. `Ok(None)` means the operator cancelled.
    fn password(&mut self, prompt: &str) -> Result<Option<SecretString>, InputError>;

    /// Show a message to the operator.
    fn message(&mut self, text: &str);
}

/// Advisory check that an address answers before a session is tried.
pub trait Reachability {
    /// True if `address` answered.
    fn is_reachable(&self, address: &str) -> impl Future<Output = bool> + Send;
}

/// Check the strict `a.b.c.d` format (one to three digits per octet).
pub fn validate_address_format(address: &str) -> Result<(), InputError> {
    if DOTTED_QUAD.is_match(address) {
        Ok(())
    } else {
        Err(InputError::InvalidAddress(address.to_string()))
    }
}

/// Format check first; the probe only runs for well-formed addresses.
pub async fn validate_address(address: &str, probe: &impl Reachability) -> Result<(), InputError> {
    validate_address_format(address)?;
    if probe.is_reachable(address).await {
        Ok(())
    } else {
        Err(InputError::Unreachable(address.to_string()))
    }
}

/// One ICMP echo through the system `ping` binary.
#[derive(Debug, Clone)]
pub struct PingProbe {
    timeout: Duration,
}

impl PingProbe {
    /// Probe with the given overall timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl Reachability for PingProbe {
    async fn is_reachable(&self, address: &str) -> bool {
        let wait_secs = self.timeout.as_secs().max(1).to_string();
        let wait_ms = self.timeout.as_millis().max(1).to_string();

        let mut command = tokio::process::Command::new("ping");
        if cfg!(windows) {
            command.args(["-n", "1", "-w", wait_ms.as_str(), address]);
        } else {
            command.args(["-c", "1", "-W", wait_secs.as_str(), address]);
        }
        command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout + Duration::from_secs(1), command.status()).await {
            Ok(Ok(status)) => {
                debug!("ping {} exited with {}", address, status);
                status.success()
            }
            Ok(Err(e)) => {
                warn!("Could not run ping: {}", e);
                false
            }
            Err(_) => false,
        }
    }
}

/// `dialoguer`-backed console prompter.
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn input(&mut self, prompt: &str) -> Result<Option<String>, InputError> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map(Some)
            .or_else(cancelled)
    }

    fn password(&mut self, prompt: &str) -> Result<Option<SecretString>, InputError> {
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map(|value| Some(SecretString::from(value)))
            .or_else(cancelled)
    }

    fn message(&mut self, text: &str) {
        eprintln!("{}", text);
    }
}

fn cancelled<T>(err: dialoguer::Error) -> Result<Option<T>, InputError> {
    let dialoguer::Error::IO(io) = err;
    if io.kind() == std::io::ErrorKind::Interrupted {
        Ok(None)
    } else {
        Err(InputError::Prompt(io.to_string()))
    }
}

/// Gathers validated credentials from the operator.
pub struct InputCollector<P, R> {
    prompter: P,
    probe: R,
}

impl<P: Prompter, R: Reachability> InputCollector<P, R> {
    /// Create a collector over a console and a reachability probe.
    pub fn new(prompter: P, probe: R) -> Self {
        Self { prompter, probe }
    }

    /// Show a message to the operator.
    pub fn notify(&mut self, text: &str) {
        self.prompter.message(text);
    }

    /// Ask until a well-formed, reachable address is given.
    ///
    /// A `preset` (from the command line) is validated like typed input.
    pub async fn address(&mut self, preset: Option<String>) -> Result<Option<String>, InputError> {
        let mut candidate = preset;
        loop {
            let address = match candidate.take() {
                Some(address) => address,
                None => match self
                    .prompter
                    .input("Enter the device IP address (e.g., 172.30.20.41)")?
                {
                    Some(address) => address,
                    None => return Ok(None),
                },
            };
            let address = address.trim().to_string();

            match validate_address(&address, &self.probe).await {
                Ok(()) => return Ok(Some(address)),
                Err(e) => {
                    debug!("{}", e);
                    self.prompter
                        .message("Invalid IP address format or is not pingable. Please try again.");
                }
            }
        }
    }

    /// Ask until a non-empty username is given.
    pub fn username(&mut self, preset: Option<String>) -> Result<Option<String>, InputError> {
        if let Some(username) = preset
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
        {
            return Ok(Some(username));
        }
        loop {
            match self.prompter.input("Enter the OLT login")? {
                None => return Ok(None),
                Some(username) if !username.trim().is_empty() => {
                    return Ok(Some(username.trim().to_string()));
                }
                Some(_) => self.prompter.message("Username cannot be empty."),
            }
        }
    }

    /// Ask until a non-empty login password is given.
    pub fn password(&mut self) -> Result<Option<SecretString>, InputError> {
        self.non_empty_secret("Enter your password")
    }

    /// Ask until a non-empty privileged secret is given.
    pub fn secret(&mut self) -> Result<Option<SecretString>, InputError> {
        self.non_empty_secret("Enter your secret password")
    }

    fn non_empty_secret(&mut self, prompt: &str) -> Result<Option<SecretString>, InputError> {
        loop {
            match self.prompter.password(prompt)? {
                None => {
                    self.prompter.message("Password input cancelled.");
                    return Ok(None);
                }
                Some(value) if !value.expose_secret().is_empty() => return Ok(Some(value)),
                Some(_) => self.prompter.message("Password cannot be empty."),
            }
        }
    }

    /// Collect all four fields. `Ok(None)` if the operator cancelled.
    pub async fn collect(
        &mut self,
        address: Option<String>,
        username: Option<String>,
    ) -> Result<Option<Credentials>, InputError> {
        let Some(address) = self.address(address).await? else {
            return Ok(None);
        };
        let Some(username) = self.username(username)? else {
            return Ok(None);
        };
        let Some(password) = self.password()? else {
            return Ok(None);
        };
        let Some(secret) = self.secret()? else {
            return Ok(None);
        };

        Ok(Some(Credentials::new(address, username, password, secret)))
    }

    /// Ask for username and password again, keeping address and secret.
    pub fn recollect_login(&mut self, credentials: &mut Credentials) -> Result<bool, InputError> {
        let Some(username) = self.username(None)? else {
            return Ok(false);
        };
        let Some(password) = self.password()? else {
            return Ok(false);
        };
        credentials.replace_login(username, password);
        Ok(true)
    }
}

impl<P: Prompter, R: Reachability> SecretPrompt for InputCollector<P, R> {
    fn new_secret(&mut self) -> Option<SecretString> {
        match self.secret() {
            Ok(secret) => secret,
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }
}
