use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ferrolt::config::AppConfig;
use ferrolt::input::{ConsolePrompter, InputCollector, PingProbe};
use ferrolt::logging::init_console;
use ferrolt::provision::PassOutcome;
use ferrolt::runner::{RunOptions, Runner};
use ferrolt::transport::SshConnector;

/// Reboot every ONU behind the in-service GPON cards of a ZTE OLT.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Device IP address (asked for when omitted)
    #[arg(short, long, env = "FERROLT_ADDRESS")]
    address: Option<String>,

    /// Login username (asked for when omitted)
    #[arg(short, long, env = "FERROLT_USERNAME")]
    username: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run log file (overrides the configuration file)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// SSH port (overrides the configuration file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Stop after this many rejected secret passwords
    #[arg(long)]
    max_escalation_attempts: Option<u32>,

    /// Read the card table and print the commands without sending them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_console();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ferrolt::Error> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.log_file {
        config.log.file = path;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.max_escalation_attempts.is_some() {
        config.max_escalation_attempts = cli.max_escalation_attempts;
    }

    let log = config.log.open()?;
    let collector = InputCollector::new(ConsolePrompter, PingProbe::default());
    let runner = Runner::new(config, SshConnector, collector, log);

    let outcome = runner
        .run(RunOptions {
            address: cli.address,
            username: cli.username,
            dry_run: cli.dry_run,
        })
        .await?;

    match outcome {
        None => eprintln!("Cancelled."),
        Some(PassOutcome::Planned(commands)) => {
            for command in commands {
                println!("{command}");
            }
        }
        Some(PassOutcome::TableNotFound) => {
            eprintln!("No card status table in the device output; nothing was sent.");
        }
        Some(PassOutcome::Completed(report)) => {
            println!(
                "Sent {} commands to {} cards ({} reserved cards skipped, {} warnings).",
                report.commands_sent,
                report.rows_visited,
                report.rows_skipped,
                report.warnings
            );
        }
    }

    Ok(())
}
