//! Per-port command sequencing over the discovered cards.
//!
//! One pass enters configuration mode, reads the status table, and for every
//! in-service card outside the reserved slots runs the per-port catalog
//! entries once per port. The first error aborts the pass; the session is
//! disconnected on every exit path.

use std::collections::BTreeSet;

use log::debug;

use crate::catalog::{CommandCatalog, RenderedCommand};
use crate::error::{CatalogError, Result};
use crate::logging::RunLog;
use crate::session::SessionManager;
use crate::table::{CardRow, StatusTableParser};
use crate::transport::Connector;

/// Slots that never receive commands.
pub const DEFAULT_RESERVED_SLOTS: [u32; 2] = [5, 6];

/// Command that prints the card status table.
pub const DEFAULT_STATUS_COMMAND: &str = "show card";

/// Counters for a completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Rows that received commands.
    pub rows_visited: usize,
    /// Rows skipped because their slot is reserved.
    pub rows_skipped: usize,
    /// Commands sent and acknowledged by their expected pattern.
    pub commands_sent: usize,
    /// Acknowledged commands whose output carried a device error.
    pub warnings: usize,
}

/// How a pass ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every planned command was sent.
    Completed(ProvisionReport),
    /// Dry run: the commands that would have been sent.
    Planned(Vec<String>),
    /// The status table marker was not in the output.
    TableNotFound,
}

/// Drives the per-port catalog entries through a session.
#[derive(Debug, Clone)]
pub struct ProvisioningDriver {
    catalog: CommandCatalog,
    reserved_slots: BTreeSet<u32>,
    status_command: String,
    log: RunLog,
}

impl ProvisioningDriver {
    /// Create a driver with the default reserved slots and status command.
    pub fn new(catalog: CommandCatalog, log: RunLog) -> Self {
        Self {
            catalog,
            reserved_slots: DEFAULT_RESERVED_SLOTS.into_iter().collect(),
            status_command: DEFAULT_STATUS_COMMAND.to_string(),
            log,
        }
    }

    /// Replace the reserved slot set.
    pub fn with_reserved_slots(mut self, slots: impl IntoIterator<Item = u32>) -> Self {
        self.reserved_slots = slots.into_iter().collect();
        self
    }

    /// Replace the status table command.
    pub fn with_status_command(mut self, command: impl Into<String>) -> Self {
        self.status_command = command.into();
        self
    }

    /// Check if `slot` is excluded from provisioning.
    pub fn is_reserved(&self, slot: u32) -> bool {
        self.reserved_slots.contains(&slot)
    }

    /// Render every command a pass over `rows` would send, in order.
    pub fn plan(&self, rows: &[CardRow]) -> std::result::Result<Vec<RenderedCommand>, CatalogError> {
        let mut commands = Vec::new();
        for row in rows.iter().filter(|row| !self.is_reserved(row.slot)) {
            for port in 1..=row.port {
                for spec in self.catalog.per_port() {
                    commands.push(spec.render(row.slot, port)?);
                }
            }
        }
        Ok(commands)
    }

    /// Send the per-port sequence for every non-reserved row.
    ///
    /// Stops at the first error.
    pub async fn run<C: Connector>(
        &self,
        session: &mut SessionManager<C>,
        rows: &[CardRow],
    ) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::default();

        for row in rows {
            if self.is_reserved(row.slot) {
                debug!("Skipping reserved slot {}", row.slot);
                report.rows_skipped += 1;
                continue;
            }
            report.rows_visited += 1;

            for port in 1..=row.port {
                for spec in self.catalog.per_port() {
                    let rendered = spec.render(row.slot, port)?;
                    let response = session.send_command(&rendered.command, &rendered.expect).await?;

                    if let Some(failure) = &response.failure_message {
                        report.warnings += 1;
                        self.log.warn(format!(
                            "'{}' reported '{}': {}",
                            rendered.command,
                            failure,
                            response.result.trim()
                        ));
                    }
                    self.log.info(&rendered.command);
                    report.commands_sent += 1;
                }
            }
        }

        Ok(report)
    }

    /// One full pass: enter configuration mode, read the status table,
    /// provision (or plan, when `dry_run`), then disconnect.
    ///
    /// Errors are logged before being returned; `disconnect` runs exactly
    /// once whatever the outcome.
    pub async fn execute<C: Connector>(
        &self,
        session: &mut SessionManager<C>,
        parser: &StatusTableParser,
        dry_run: bool,
    ) -> Result<PassOutcome> {
        let result = self.pass(session, parser, dry_run).await;

        if let Err(e) = &result {
            self.log.error(format!("Process error: {}", e));
        }
        session.disconnect().await;

        result
    }

    async fn pass<C: Connector>(
        &self,
        session: &mut SessionManager<C>,
        parser: &StatusTableParser,
        dry_run: bool,
    ) -> Result<PassOutcome> {
        let enter = self.catalog.enter_config()?.render(0, 0)?;
        session.send_command(&enter.command, &enter.expect).await?;
        self.log.info(&enter.command);

        let status = session.send_command_at_prompt(&self.status_command).await?;
        self.log.info(&self.status_command);

        let Some(rows) = parser.parse(&status.raw_result) else {
            self.log.warn(format!(
                "String '{}' not found in output.",
                parser.layout().marker
            ));
            return Ok(PassOutcome::TableNotFound);
        };
        debug!("Status table rows: {:?}", rows);

        if dry_run {
            let planned = self.plan(&rows)?.into_iter().map(|c| c.command).collect();
            return Ok(PassOutcome::Planned(planned));
        }

        let report = self.run(session, &rows).await?;
        self.log.info(format!(
            "Done: {} commands on {} cards ({} reserved skipped, {} warnings)",
            report.commands_sent, report.rows_visited, report.rows_skipped, report.warnings
        ));
        Ok(PassOutcome::Completed(report))
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::credentials::Credentials;
    use crate::platform::zte_zxros;
    use crate::session::SessionOptions;
    use crate::testing::{FakeOlt, SharedBuffer};

    const EXAMPLE: &str = "Shelf Slot Port Status\n1 3 4 INSERVICE\n1 5 2 INSERVICE\n1 7 0 INSERVICE\n";

    fn driver(log: RunLog) -> ProvisioningDriver {
        ProvisioningDriver::new(CommandCatalog::onu_reboot(), log)
    }

    async fn connected(olt: &FakeOlt, log: RunLog) -> SessionManager<FakeOlt> {
        let mut session = SessionManager::new(
            olt.clone(),
            zte_zxros::platform().unwrap(),
            SessionOptions::default(),
            log,
        )
        .unwrap();
        let mut credentials = Credentials::new(
            "10.0.0.1",
            "admin",
            SecretString::from("login"),
            SecretString::from("enable"),
        );
        let mut no_retry = || -> Option<SecretString> { None };
        session.connect(&mut credentials, &mut no_retry).await.unwrap();
        session
    }

    fn row(slot: u32, port: u32) -> CardRow {
        CardRow { shelf: 1, slot, port }
    }

    #[test]
    fn test_plan_per_port_order() {
        let commands: Vec<_> = driver(RunLog::console_only())
            .plan(&[row(2, 2)])
            .unwrap()
            .into_iter()
            .map(|c| c.command)
            .collect();

        assert_eq!(
            commands,
            vec![
                "interface gpon_olt-1/2/1",
                "onu-action omci-reboot",
                "exit",
                "interface gpon_olt-1/2/2",
                "onu-action omci-reboot",
                "exit",
            ]
        );
    }

    #[test]
    fn test_plan_three_commands_per_port() {
        let driver = driver(RunLog::console_only());
        for ports in [1, 4, 16] {
            assert_eq!(driver.plan(&[row(3, ports)]).unwrap().len(), 3 * ports as usize);
        }
    }

    #[test]
    fn test_reserved_slots_never_planned() {
        let driver = driver(RunLog::console_only());
        assert!(driver.plan(&[row(5, 16), row(6, 8)]).unwrap().is_empty());

        let custom = driver.with_reserved_slots([2]);
        assert!(custom.plan(&[row(2, 4)]).unwrap().is_empty());
        assert_eq!(custom.plan(&[row(5, 1)]).unwrap().len(), 3);
    }

    #[test]
    fn test_example_table_plans_twelve_commands() {
        let rows = StatusTableParser::default().parse(EXAMPLE).unwrap();
        let plan = driver(RunLog::console_only()).plan(&rows).unwrap();

        assert_eq!(plan.len(), 12);
        assert!(plan.iter().all(|c| !c.command.contains("-1/5/")));
        assert_eq!(plan[9].command, "interface gpon_olt-1/3/4");
    }

    #[tokio::test]
    async fn test_pass_sends_every_command_and_disconnects() {
        let olt = FakeOlt::new("enable");
        let buffer = SharedBuffer::default();
        let log = RunLog::new(buffer.clone());
        let mut session = connected(&olt, log.clone()).await;

        let outcome = driver(log)
            .execute(&mut session, &StatusTableParser::default(), false)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PassOutcome::Completed(ProvisionReport {
                rows_visited: 2,
                rows_skipped: 2,
                commands_sent: 9,
                warnings: 0,
            })
        );

        let commands = olt.commands();
        assert_eq!(commands[..2], ["configure terminal", "show card"]);
        assert_eq!(commands.len(), 11);
        assert_eq!(commands[2], "interface gpon_olt-1/3/1");
        assert_eq!(commands[8], "interface gpon_olt-1/7/1");
        assert!(commands.iter().all(|c| !c.contains("-1/5/") && !c.contains("-1/6/")));
        assert_eq!(olt.closed(), 1);

        let lines = buffer.lines();
        assert!(lines.iter().any(|l| l.ends_with(" - INFO - interface gpon_olt-1/7/1")));
        assert!(lines.iter().any(|l| l.ends_with(" - INFO - Disconnected from the device.")));
    }

    #[tokio::test]
    async fn test_example_table_against_device() {
        let olt = FakeOlt::new("enable").card_table(EXAMPLE);
        let mut session = connected(&olt, RunLog::console_only()).await;

        driver(RunLog::console_only())
            .execute(&mut session, &StatusTableParser::default(), false)
            .await
            .unwrap();

        assert_eq!(olt.commands().len(), 2 + 12);
        assert_eq!(olt.closed(), 1);
    }

    #[tokio::test]
    async fn test_table_not_found_sends_nothing() {
        let olt = FakeOlt::new("enable").card_table("% Unknown command.");
        let buffer = SharedBuffer::default();
        let log = RunLog::new(buffer.clone());
        let mut session = connected(&olt, log.clone()).await;

        let outcome = driver(log)
            .execute(&mut session, &StatusTableParser::default(), false)
            .await
            .unwrap();

        assert_eq!(outcome, PassOutcome::TableNotFound);
        assert_eq!(olt.commands(), vec!["configure terminal", "show card"]);
        assert_eq!(olt.closed(), 1);
        assert!(
            buffer
                .lines()
                .iter()
                .any(|l| l.ends_with("String 'Shelf' not found in output."))
        );
    }

    #[tokio::test]
    async fn test_first_error_aborts_pass() {
        let olt = FakeOlt::new("enable").fail_on("interface gpon_olt-1/3/2");
        let buffer = SharedBuffer::default();
        let log = RunLog::new(buffer.clone());
        let mut session = connected(&olt, log.clone()).await;

        let err = driver(log)
            .execute(&mut session, &StatusTableParser::default(), false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Channel(crate::error::ChannelError::PatternTimeout { .. })
        ));
        let commands = olt.commands();
        assert_eq!(commands.last().map(String::as_str), Some("interface gpon_olt-1/3/2"));
        assert_eq!(commands.len(), 2 + 4);
        assert_eq!(olt.closed(), 1);
        assert!(buffer.lines().iter().any(|l| l.contains(" - ERROR - Process error: ")));
    }

    #[tokio::test]
    async fn test_device_error_with_expected_prompt_only_warns() {
        let olt = FakeOlt::new("enable").fail_on("onu-action omci-reboot");
        let buffer = SharedBuffer::default();
        let log = RunLog::new(buffer.clone());
        let mut session = connected(&olt, log.clone()).await;

        let outcome = driver(log)
            .execute(&mut session, &StatusTableParser::default(), false)
            .await
            .unwrap();

        let PassOutcome::Completed(report) = outcome else {
            panic!("unexpected outcome {:?}", outcome);
        };
        assert_eq!(report.commands_sent, 9);
        assert_eq!(report.warnings, 3);
        assert_eq!(
            buffer.lines().iter().filter(|l| l.contains(" - WARN - 'onu-action")).count(),
            3
        );
    }

    #[tokio::test]
    async fn test_dry_run_sends_no_port_commands() {
        let olt = FakeOlt::new("enable");
        let mut session = connected(&olt, RunLog::console_only()).await;

        let outcome = driver(RunLog::console_only())
            .execute(&mut session, &StatusTableParser::default(), true)
            .await
            .unwrap();

        let PassOutcome::Planned(planned) = outcome else {
            panic!("unexpected outcome {:?}", outcome);
        };
        assert_eq!(planned.len(), 9);
        assert_eq!(olt.commands(), vec!["configure terminal", "show card"]);
        assert_eq!(olt.closed(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_failure_is_logged_not_returned() {
        let olt = FakeOlt::new("enable").close_fails().card_table("nothing here");
        let buffer = SharedBuffer::default();
        let log = RunLog::new(buffer.clone());
        let mut session = connected(&olt, log.clone()).await;

        let outcome = driver(log)
            .execute(&mut session, &StatusTableParser::default(), false)
            .await
            .unwrap();

        assert_eq!(outcome, PassOutcome::TableNotFound);
        assert!(
            buffer
                .lines()
                .iter()
                .any(|l| l.contains(" - ERROR - Error while exiting the device: "))
        );
    }
}
