//! End-to-end run: collect credentials, connect, one provisioning pass.

use crate::config::AppConfig;
use crate::error::{ChannelError, Error, Result, SessionError};
use crate::input::{InputCollector, Prompter, Reachability};
use crate::logging::RunLog;
use crate::platform::zte_zxros;
use crate::provision::{PassOutcome, ProvisioningDriver};
use crate::session::SessionManager;
use crate::table::StatusTableParser;
use crate::transport::Connector;

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Device address; asked for when absent.
    pub address: Option<String>,

    /// Login username; asked for when absent.
    pub username: Option<String>,

    /// Print the commands instead of sending them.
    pub dry_run: bool,
}

/// Wires operator input, the session and the provisioning driver together.
pub struct Runner<C, P, R> {
    config: AppConfig,
    connector: C,
    collector: InputCollector<P, R>,
    log: RunLog,
}

impl<C, P, R> Runner<C, P, R>
where
    C: Connector,
    P: Prompter,
    R: Reachability,
{
    pub fn new(config: AppConfig, connector: C, collector: InputCollector<P, R>, log: RunLog) -> Self {
        Self {
            config,
            connector,
            collector,
            log,
        }
    }

    /// Run once. `Ok(None)` means the operator cancelled before a pass
    /// started.
    ///
    /// A login the device refuses sends the operator back to the username
    /// and password prompts (the address is kept). Escalation failures are
    /// retried inside [`SessionManager::connect`] with a new secret.
    ///
    /// Once connected, nothing asks for credentials again: if entering
    /// configuration mode fails, the pass ends with a process error and
    /// the session is closed.
    pub async fn run(mut self, options: RunOptions) -> Result<Option<PassOutcome>> {
        self.config.catalog.validate()?;

        let Some(mut credentials) = self
            .collector
            .collect(options.address, options.username)
            .await?
        else {
            return Ok(None);
        };

        let platform = zte_zxros::platform().map_err(ChannelError::from)?;
        let mut session = SessionManager::new(
            self.connector,
            platform,
            self.config.session_options(),
            self.log.clone(),
        )?;

        loop {
            match session.connect(&mut credentials, &mut self.collector).await {
                Ok(()) => break,
                Err(Error::Transport(e)) => {
                    self.log.error(format!("Connection error: {}", e));
                    self.collector.notify(
                        "Incorrect password. Please enter with your username and password again or press Ctrl+C to exit.",
                    );
                    if !self.collector.recollect_login(&mut credentials)? {
                        return Ok(None);
                    }
                }
                Err(Error::Session(SessionError::Cancelled)) => {
                    self.log.warn("Secret password entry cancelled.");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }

        let driver = ProvisioningDriver::new(self.config.catalog.clone(), self.log.clone())
            .with_reserved_slots(self.config.reserved_slots.iter().copied())
            .with_status_command(self.config.status_command.clone());
        let parser = StatusTableParser::new(self.config.table.clone());

        driver
            .execute(&mut session, &parser, options.dry_run)
            .await
            .map(Some)
    }
}
