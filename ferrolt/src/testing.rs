//! In-memory doubles for unit tests.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{ChannelError, InputError, Result, TransportError};
use crate::input::{Prompter, Reachability};
use crate::transport::{Connector, SshConfig, Transport};

/// Status table printed by [`FakeOlt`] for `show card`.
pub const CARD_TABLE: &str = "Shelf Slot CfgType RealType Port  HardVer SoftVer   Status\r\n\
    -------------------------------------------------------------\r\n\
    1     1    PRWGS   PRWGS    0     V1.0    V1.2.3    INSERVICE\r\n\
    1     3    GTGH    GTGH     2     V1.0    V2.1.0    INSERVICE\r\n\
    1     4    GTGH             16                      OFFLINE\r\n\
    1     5    SMXA    SMXA     2     V1.0    V2.1.0    INSERVICE\r\n\
    1     6    SMXA    SMXA     2     V1.0    V2.1.0    INSERVICE\r\n\
    1     7    GTGO    GTGO     1     V1.0    V2.1.0    INSERVICE";

/// `Write` sink whose contents can be inspected after being moved into a
/// [`RunLog`](crate::logging::RunLog).
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far, one entry per line.
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Secret prompt answering from a fixed list, then `None`.
pub fn secrets<const N: usize>(values: [&str; N]) -> impl FnMut() -> Option<SecretString> {
    let mut queue: VecDeque<SecretString> = values.into_iter().map(SecretString::from).collect();
    move || queue.pop_front()
}

/// Reachability probe with a fixed answer that remembers what it probed.
#[derive(Debug, Clone)]
pub struct FakeProbe {
    reachable: bool,
    probed: Arc<Mutex<Vec<String>>>,
}

impl FakeProbe {
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            probed: Arc::default(),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            probed: Arc::default(),
        }
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

impl Reachability for FakeProbe {
    async fn is_reachable(&self, address: &str) -> bool {
        self.probed.lock().unwrap().push(address.to_string());
        self.reachable
    }
}

#[derive(Debug, Default)]
struct Script {
    inputs: VecDeque<String>,
    passwords: VecDeque<String>,
    messages: Vec<String>,
}

/// Console double replaying scripted answers; an exhausted script reads as
/// the operator cancelling.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter(Arc<Mutex<Script>>);

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inputs<const N: usize>(self, values: [&str; N]) -> Self {
        self.0
            .lock()
            .unwrap()
            .inputs
            .extend(values.into_iter().map(str::to_string));
        self
    }

    pub fn passwords<const N: usize>(self, values: [&str; N]) -> Self {
        self.0
            .lock()
            .unwrap()
            .passwords
            .extend(values.into_iter().map(str::to_string));
        self
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().messages.clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&mut self, _prompt: &str) -> std::result::Result<Option<String>, InputError> {
        Ok(self.0.lock().unwrap().inputs.pop_front())
    }

    fn password(&mut self, _prompt: &str) -> std::result::Result<Option<SecretString>, InputError> {
        Ok(self.0.lock().unwrap().passwords.pop_front().map(SecretString::from))
    }

    fn message(&mut self, text: &str) {
        self.0.lock().unwrap().messages.push(text.to_string());
    }
}

/// How [`FakeOlt`] misbehaves when `enable` is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableFault {
    /// Never answer, so the read times out.
    Hang,
    /// Drop the channel.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Exec,
    Password,
    Enable,
    Config,
    Interface(u32, u32),
}

#[derive(Debug)]
struct OltState {
    secret: String,
    start_privileged: bool,
    login_password: Option<String>,
    close_fails: bool,
    card_table: String,
    failing: Vec<String>,
    enable_fault: Option<EnableFault>,
    dropped: bool,
    mode: Mode,
    pending: String,
    written: Vec<String>,
    opened: usize,
    closed: usize,
}

/// Simulated ZTE OLT shell behind the [`Connector`] / [`Transport`] seam.
///
/// Output for each write is queued and handed out by `read_until`; if the
/// queued output does not match the pattern the read fails at once with a
/// pattern timeout, since nothing more will ever arrive.
#[derive(Debug, Clone)]
pub struct FakeOlt(Arc<Mutex<OltState>>);

impl FakeOlt {
    /// Device whose enable secret is `secret`, starting at the `>` prompt.
    pub fn new(secret: &str) -> Self {
        Self(Arc::new(Mutex::new(OltState {
            secret: secret.to_string(),
            start_privileged: false,
            login_password: None,
            close_fails: false,
            card_table: CARD_TABLE.to_string(),
            failing: Vec::new(),
            enable_fault: None,
            dropped: false,
            mode: Mode::Exec,
            pending: String::new(),
            written: Vec::new(),
            opened: 0,
            closed: 0,
        })))
    }

    /// Land in enable mode after login.
    pub fn start_privileged(self) -> Self {
        self.state().start_privileged = true;
        self
    }

    /// Only accept logins with `password`.
    pub fn login_password(self, password: &str) -> Self {
        self.state().login_password = Some(password.to_string());
        self
    }

    /// Report an error from `close`.
    pub fn close_fails(self) -> Self {
        self.state().close_fails = true;
        self
    }

    /// Replace the `show card` body.
    pub fn card_table(self, table: &str) -> Self {
        self.state().card_table = table.to_string();
        self
    }

    /// Answer `command` with an error and stay in the current mode.
    pub fn fail_on(self, command: &str) -> Self {
        self.state().failing.push(command.to_string());
        self
    }

    /// Misbehave on the first `enable` of the next session only.
    pub fn enable_fails_once(self, fault: EnableFault) -> Self {
        self.state().enable_fault = Some(fault);
        self
    }

    /// Every line written, secrets included.
    pub fn written(&self) -> Vec<String> {
        self.state().written.clone()
    }

    /// Lines written after the session reached enable mode.
    pub fn commands(&self) -> Vec<String> {
        let written = self.written();
        let start = written
            .iter()
            .position(|line| line == "terminal length 0")
            .map_or(0, |i| i + 1);
        written[start..].to_vec()
    }

    pub fn opened(&self) -> usize {
        self.state().opened
    }

    pub fn closed(&self) -> usize {
        self.state().closed
    }

    fn state(&self) -> MutexGuard<'_, OltState> {
        self.0.lock().unwrap()
    }
}

impl OltState {
    fn prompt(&self) -> String {
        match self.mode {
            Mode::Exec => "ZXAN>".to_string(),
            Mode::Password => "Password:".to_string(),
            Mode::Enable => "ZXAN#".to_string(),
            Mode::Config => "ZXAN(config)#".to_string(),
            Mode::Interface(slot, port) => format!("ZXAN(config-if-gpon_olt-1/{}/{})#", slot, port),
        }
    }

    fn respond(&mut self, line: &str) {
        self.written.push(line.to_string());

        if self.mode == Mode::Exec && line.trim() == "enable" {
            if let Some(fault) = self.enable_fault.take() {
                self.dropped = fault == EnableFault::Drop;
                return;
            }
        }

        if self.mode == Mode::Password {
            self.mode = if line == self.secret {
                Mode::Enable
            } else {
                self.pending.push_str("\r\n% Bad password.");
                Mode::Exec
            };
            let prompt = self.prompt();
            self.pending.push_str(&format!("\r\n{}", prompt));
            return;
        }

        let output = if self.failing.iter().any(|f| f == line) {
            "%Error 20203: Invalid card or port.".to_string()
        } else {
            self.execute(line)
        };

        let prompt = self.prompt();
        self.pending.push_str(line);
        self.pending.push_str("\r\n");
        if !output.is_empty() {
            self.pending.push_str(&output);
            self.pending.push_str("\r\n");
        }
        self.pending.push_str(&prompt);
    }

    fn execute(&mut self, line: &str) -> String {
        let line = line.trim();
        match (self.mode, line) {
            (Mode::Exec, "enable") => {
                self.mode = Mode::Password;
                return String::new();
            }
            (Mode::Enable, "disable") => self.mode = Mode::Exec,
            (Mode::Enable, "terminal length 0") => {}
            (Mode::Enable, "configure terminal") => {
                self.mode = Mode::Config;
                return "Enter configuration commands, one per line.  End with CNTL/Z.".to_string();
            }
            (Mode::Enable | Mode::Config, "show card") => return self.card_table.clone(),
            (Mode::Config, "exit") | (Mode::Config | Mode::Interface(..), "end") => {
                self.mode = Mode::Enable
            }
            (Mode::Interface(..), "exit") => self.mode = Mode::Config,
            (Mode::Interface(..), "onu-action omci-reboot") => {}
            (Mode::Config, _) if line.starts_with("interface gpon_olt-1/") => {
                let mut parts = line["interface gpon_olt-1/".len()..].split('/');
                match (
                    parts.next().and_then(|s| s.parse().ok()),
                    parts.next().and_then(|s| s.parse().ok()),
                ) {
                    (Some(slot), Some(port)) => self.mode = Mode::Interface(slot, port),
                    _ => return "%Error 20200: Invalid input.".to_string(),
                }
            }
            _ => return "%Error 20200: Invalid input.".to_string(),
        }
        String::new()
    }
}

impl Connector for FakeOlt {
    type Transport = FakeOlt;

    async fn open(&self, config: &SshConfig) -> Result<FakeOlt> {
        let mut state = self.state();
        state.opened += 1;

        let rejected = state
            .login_password
            .as_deref()
            .is_some_and(|expected| expected != config.password.expose_secret());
        if rejected {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        state.dropped = false;
        state.mode = if state.start_privileged {
            Mode::Enable
        } else {
            Mode::Exec
        };
        let prompt = state.prompt();
        state.pending = format!("Welcome to ZXAN product C600\r\n\r\n{}", prompt);
        drop(state);

        Ok(self.clone())
    }
}

impl Transport for FakeOlt {
    async fn write(&mut self, text: &str) -> Result<()> {
        let mut state = self.state();
        if state.dropped {
            return Err(ChannelError::Closed.into());
        }
        state.respond(text);
        Ok(())
    }

    async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> Result<String> {
        let mut state = self.state();
        if state.dropped {
            return Err(ChannelError::Closed.into());
        }
        if pattern.is_match(state.pending.as_bytes()) {
            Ok(std::mem::take(&mut state.pending))
        } else {
            Err(ChannelError::PatternTimeout {
                pattern: pattern.as_str().to_string(),
                timeout,
            }
            .into())
        }
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state();
        state.closed += 1;
        state.pending.clear();
        if state.close_fails {
            return Err(TransportError::Disconnected.into());
        }
        Ok(())
    }
}

