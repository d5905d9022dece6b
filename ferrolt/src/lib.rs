//! # Ferrolt
//!
//! Bulk ONU maintenance for GPON OLTs over an interactive SSH CLI session.
//!
//! Ferrolt logs into a ZTE OLT, escalates to privileged mode (asking for a
//! new secret until escalation succeeds), reads the `show card` table and
//! reboots the ONUs behind every in-service GPON port, one port at a time,
//! waiting for the expected prompt after each command.
//!
//! ## Features
//!
//! - Async SSH shell sessions via russh
//! - Tail-search pattern buffer with ANSI stripping
//! - Privilege level tracking with graph-based navigation
//! - Declarative command catalog with `{slot}` / `{port}` placeholders
//! - Data-driven status table parsing
//! - Size-rotated operator log
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferrolt::config::AppConfig;
//! use ferrolt::input::{ConsolePrompter, InputCollector, PingProbe};
//! use ferrolt::runner::{RunOptions, Runner};
//! use ferrolt::transport::SshConnector;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ferrolt::Error> {
//!     let config = AppConfig::load(None)?;
//!     let log = config.log.open()?;
//!     let collector = InputCollector::new(ConsolePrompter, PingProbe::default());
//!
//!     let outcome = Runner::new(config, SshConnector, collector, log)
//!         .run(RunOptions::default())
//!         .await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod channel;
pub mod config;
pub mod credentials;
pub mod error;
pub mod input;
pub mod logging;
pub mod platform;
pub mod provision;
pub mod runner;
pub mod session;
pub mod table;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use catalog::{CommandCatalog, CommandSpec};
pub use credentials::Credentials;
pub use error::Error;
pub use logging::RunLog;
pub use platform::{PlatformDefinition, PrivilegeLevel};
pub use provision::{PassOutcome, ProvisionReport, ProvisioningDriver};
pub use session::{Response, SessionManager, SessionState};
pub use table::{CardRow, StatusTableParser, TableLayout};
pub use transport::SshConfig;
