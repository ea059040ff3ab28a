//! Startup wiring: roster, channel, interrupt handling, loop.

use anyhow::{Context, Result};
use gatekeeper_controller::{Gatekeeper, RunReport};
use gatekeeper_device::{AnyChannel, DeviceChannel, SerialChannel, SimulatedChannel};
use gatekeeper_roster::{Roster, open_provider};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{GatekeeperConfig, RosterConfig};

/// Load the roster, open the channel and run the chosen loop to completion.
///
/// An interrupt at any point, startup included, ends the run cleanly.
///
/// # Errors
///
/// Fails if the roster cannot be loaded, the serial port cannot be opened,
/// or the loop aborts.
pub async fn run(config: GatekeeperConfig, simulate: bool) -> Result<RunReport> {
    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_interrupt(shutdown.clone()));
    // Let the watcher install its handler before the blocking roster load.
    tokio::task::yield_now().await;

    run_until(config, simulate, &shutdown).await
}

async fn run_until(
    config: GatekeeperConfig,
    simulate: bool,
    shutdown: &CancellationToken,
) -> Result<RunReport> {
    let roster = load_roster(&config.roster)?;
    if shutdown.is_cancelled() {
        info!("Interrupted during startup");
        return Ok(RunReport::cancelled());
    }

    let channel: AnyChannel = if simulate {
        // Commands are echoed on the console; nothing reads the feed side.
        let (channel, _handle) = SimulatedChannel::with_name("console");
        channel.into()
    } else {
        let mut channel = SerialChannel::open(config.serial.clone())
            .with_context(|| format!("failed to open serial port {}", config.serial.port))?;

        if !channel.settle(shutdown).await {
            info!("Interrupted during startup");
            if let Err(e) = channel.close().await {
                warn!(error = %e, "Failed to close serial port");
            }
            return Ok(RunReport::cancelled());
        }
        channel.into()
    };

    let mut gatekeeper = Gatekeeper::new(roster, channel);
    let report = if simulate {
        let input = BufReader::new(tokio::io::stdin());
        gatekeeper
            .run_simulation(input, std::io::stdout(), shutdown)
            .await
    } else {
        gatekeeper.run_live(shutdown).await
    };

    report.context("control loop aborted")
}

fn load_roster(config: &RosterConfig) -> Result<Roster> {
    let path = config.path.display();
    let provider = open_provider(&config.path, config.columns.clone())
        .with_context(|| format!("failed to open roster {path}"))?;
    let roster =
        Roster::load(provider.as_ref()).with_context(|| format!("failed to load roster {path}"))?;

    if roster.is_empty() {
        warn!(path = %path, "Roster is empty; every card will be denied");
    }
    Ok(roster)
}

async fn cancel_on_interrupt(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Interrupt received, shutting down");
            shutdown.cancel();
        }
        Err(e) => warn!(error = %e, "Failed to listen for interrupt"),
    }
}
