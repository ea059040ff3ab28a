//! `gatekeeper`: serial-port access controller.
//!
//! Usage:
//!   gatekeeper              Read UIDs from the reader on the configured serial port
//!   gatekeeper --simulate   Type UIDs on the console instead; no hardware needed

mod app;
mod config;
mod logging;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gatekeeper_controller::RunReport;
use gatekeeper_core::VERSION;
use tracing::{error, info};

use crate::config::GatekeeperConfig;

/// Grace period for blocking reads still in flight at exit.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Card-reader access controller
#[derive(Parser, Debug)]
#[command(name = "gatekeeper", version, about = "Grant or deny access to cards read on a serial port")]
struct Cli {
    /// Type card UIDs on the console instead of reading them from the serial port
    #[arg(long)]
    simulate: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match GatekeeperConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let logging = match logging::init(&config.logging, !cli.simulate) {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    tracing::dispatcher::with_default(&logging.dispatch, || {
        info!(version = VERSION, simulate = cli.simulate, "Starting gatekeeper");

        match run(config, cli.simulate) {
            Ok(report) if report.exit.is_clean() => ExitCode::SUCCESS,
            Ok(report) => {
                eprintln!("Error: {}", report.exit);
                ExitCode::FAILURE
            }
            Err(e) => {
                let message = format!("{e:#}");
                error!(error = %message, "Gatekeeper failed");
                eprintln!("Error: {message}");
                ExitCode::FAILURE
            }
        }
    })
}

fn run(config: GatekeeperConfig, simulate: bool) -> Result<RunReport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let report = runtime.block_on(app::run(config, simulate));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    report
}
