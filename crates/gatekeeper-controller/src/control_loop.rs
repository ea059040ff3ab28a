//! The gatekeeper's main loop.
//!
//! [`Gatekeeper`] owns the roster, the device channel and a clock. It runs in
//! one of two modes:
//!
//! - **live**: UIDs come from the device channel, commands go back to it;
//! - **simulation**: UIDs are typed by an operator, commands still go to the
//!   channel and each outcome is echoed to the console.
//!
//! Both modes stop when the [`CancellationToken`] fires, and both release the
//! channel before returning.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use gatekeeper_core::constants::EXIT_KEYWORD;
use gatekeeper_core::{Clock, Command, SystemClock, Verdict};
use gatekeeper_device::{ChannelError, DeviceChannel};
use gatekeeper_roster::Roster;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatcher::dispatch;
use crate::error::Result;
use crate::evaluator::evaluate;
use crate::state_machine::{LoopState, StateMachine};
use crate::stats::RunStats;

/// Pause after a transport read failure before polling again.
pub const READ_ERROR_BACKOFF: Duration = Duration::from_millis(250);

const PROMPT: &str = "Enter card UID: ";

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The cancellation token fired.
    Cancelled,
    /// The operator typed the exit keyword.
    ExitRequested,
    /// The console input reached end of file.
    InputClosed,
    /// The device channel went away.
    ChannelLost(String),
}

impl ExitReason {
    /// Returns `false` only when the run ended because the device vanished.
    pub fn is_clean(&self) -> bool {
        !matches!(self, ExitReason::ChannelLost(_))
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Cancelled => write!(f, "interrupted"),
            ExitReason::ExitRequested => write!(f, "exit requested"),
            ExitReason::InputClosed => write!(f, "input closed"),
            ExitReason::ChannelLost(reason) => write!(f, "channel lost: {reason}"),
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub exit: ExitReason,
    pub stats: RunStats,
}

impl RunReport {
    /// Report for a run interrupted before its loop started.
    pub fn cancelled() -> Self {
        Self {
            exit: ExitReason::Cancelled,
            stats: RunStats::default(),
        }
    }
}

/// Outcome of handling one UID.
struct Outcome {
    verdict: Verdict,
    command: Command,
    write_error: Option<ChannelError>,
}

/// Access controller bound to one roster and one device channel.
///
/// # Examples
///
/// ```
/// use gatekeeper_controller::{ExitReason, Gatekeeper};
/// use gatekeeper_device::SimulatedChannel;
/// use gatekeeper_roster::Roster;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let (channel, _handle) = SimulatedChannel::new();
///     let mut gatekeeper = Gatekeeper::new(Roster::default(), channel);
///
///     let input: &[u8] = b"FFFF\nexit\n";
///     let mut console = Vec::new();
///     let report = gatekeeper
///         .run_simulation(input, &mut console, &CancellationToken::new())
///         .await
///         .unwrap();
///
///     assert_eq!(report.exit, ExitReason::ExitRequested);
///     assert_eq!(report.stats.denied, 1);
/// }
/// ```
#[derive(Debug)]
pub struct Gatekeeper<C, K = SystemClock> {
    roster: Roster,
    channel: C,
    clock: K,
    machine: StateMachine,
    stats: RunStats,
}

impl<C: DeviceChannel> Gatekeeper<C, SystemClock> {
    /// Create a gatekeeper that reads the local wall clock.
    pub fn new(roster: Roster, channel: C) -> Self {
        Self::with_clock(roster, channel, SystemClock)
    }
}

impl<C: DeviceChannel, K: Clock> Gatekeeper<C, K> {
    /// Create a gatekeeper with an explicit time source.
    pub fn with_clock(roster: Roster, channel: C, clock: K) -> Self {
        Self {
            roster,
            channel,
            clock,
            machine: StateMachine::new(),
            stats: RunStats::default(),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn state(&self) -> LoopState {
        self.machine.current_state()
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Poll the device channel until cancelled or the channel is lost.
    ///
    /// Blank lines are ignored. Decode and transport errors are logged and
    /// the loop carries on; a failed command write is logged at error level
    /// and the loop carries on. The channel is closed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::State`](crate::ControlError::State) if the
    /// loop attempts an illegal state change.
    pub async fn run_live(&mut self, shutdown: &CancellationToken) -> Result<RunReport> {
        info!(
            channel = %self.channel.info(),
            cardholders = self.roster.len(),
            "Access control system started"
        );

        let result = self.live_loop(shutdown).await;
        self.finish(result).await
    }

    async fn live_loop(&mut self, shutdown: &CancellationToken) -> Result<ExitReason> {
        loop {
            self.machine.transition_to(LoopState::Polling)?;

            let read = tokio::select! {
                biased;
                () = shutdown.cancelled() => return Ok(ExitReason::Cancelled),
                read = self.channel.read_line() => read,
            };

            match read {
                Ok(Some(line)) => {
                    let uid = line.trim();
                    if uid.is_empty() {
                        self.stats.ignored += 1;
                        self.machine.transition_to(LoopState::Idle)?;
                        continue;
                    }
                    info!(uid, "UID received");
                    self.handle_uid(uid).await?;
                }
                Ok(None) => {
                    self.machine.transition_to(LoopState::Idle)?;
                }
                Err(e) if e.is_disconnected() => {
                    error!(error = %e, "Device channel lost");
                    return Ok(ExitReason::ChannelLost(e.to_string()));
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read UID, skipping");
                    self.stats.read_errors += 1;
                    self.machine.transition_to(LoopState::Idle)?;

                    if !e.is_decode_error() {
                        tokio::select! {
                            biased;
                            () = shutdown.cancelled() => return Ok(ExitReason::Cancelled),
                            () = tokio::time::sleep(READ_ERROR_BACKOFF) => {}
                        }
                    }
                }
            }
        }
    }

    /// Read UIDs from `input` and echo each outcome to `output`.
    ///
    /// The loop ends on the exit keyword (any case), at end of input, or when
    /// `shutdown` fires. Commands are still sent to the channel. The channel
    /// is closed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Console`](crate::ControlError::Console) if
    /// `output` cannot be written, or
    /// [`ControlError::State`](crate::ControlError::State) on an illegal
    /// state change.
    pub async fn run_simulation<R, W>(
        &mut self,
        input: R,
        mut output: W,
        shutdown: &CancellationToken,
    ) -> Result<RunReport>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        info!(
            channel = %self.channel.info(),
            cardholders = self.roster.len(),
            "Access control system started in simulation mode"
        );

        let result = self.simulation_loop(input, &mut output, shutdown).await;
        self.finish(result).await
    }

    async fn simulation_loop<R, W>(
        &mut self,
        input: R,
        output: &mut W,
        shutdown: &CancellationToken,
    ) -> Result<ExitReason>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        self.write_banner(output)?;
        let mut lines = input.lines();

        loop {
            self.machine.transition_to(LoopState::AwaitingInput)?;
            write!(output, "\n{PROMPT}")?;
            output.flush()?;

            let next = tokio::select! {
                biased;
                () = shutdown.cancelled() => return Ok(ExitReason::Cancelled),
                line = lines.next_line() => line,
            };

            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => {
                    writeln!(output)?;
                    return Ok(ExitReason::InputClosed);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read console input, skipping");
                    writeln!(output, "Error reading input: {e}")?;
                    self.stats.read_errors += 1;
                    self.machine.transition_to(LoopState::Idle)?;
                    continue;
                }
            };

            let uid = line.trim();
            if uid.eq_ignore_ascii_case(EXIT_KEYWORD) {
                return Ok(ExitReason::ExitRequested);
            }
            if uid.is_empty() {
                self.stats.ignored += 1;
                self.machine.transition_to(LoopState::Idle)?;
                continue;
            }

            let outcome = self.handle_uid(uid).await?;
            writeln!(output, "[SIM] sending command: {}", outcome.command)?;
            writeln!(output, "{}", outcome.verdict)?;
            if let Some(e) = outcome.write_error {
                writeln!(output, "Error sending command: {e}")?;
            }
        }
    }

    fn write_banner<W: Write>(&self, output: &mut W) -> Result<()> {
        writeln!(output, "=== SIMULATION MODE ===")?;
        writeln!(output, "Cardholders loaded: {}", self.roster.len())?;
        match self.roster.first() {
            Some(record) => writeln!(output, "Sample UID for testing: {}", record.uid)?,
            None => writeln!(output, "Roster is empty; every card will be denied")?,
        }
        writeln!(output, "Type '{EXIT_KEYWORD}' to quit")?;
        Ok(())
    }

    /// Evaluate one non-blank UID and send the resulting command.
    async fn handle_uid(&mut self, uid: &str) -> Result<Outcome> {
        self.machine.transition_to(LoopState::Evaluating)?;
        let verdict = evaluate(uid, self.clock.now(), &self.roster);
        self.stats.record(&verdict);

        self.machine.transition_to(LoopState::Dispatching)?;
        let command = verdict.command();
        let write_error = match dispatch(uid, &verdict, &mut self.channel).await {
            Ok(_) => None,
            Err(e) => {
                error!(uid, %command, error = %e, "Failed to send command");
                self.stats.write_errors += 1;
                Some(e)
            }
        };

        self.machine.transition_to(LoopState::Idle)?;
        Ok(Outcome {
            verdict,
            command,
            write_error,
        })
    }

    async fn finish(&mut self, result: Result<ExitReason>) -> Result<RunReport> {
        if let Some(last) = self.machine.shut_down() {
            debug!(
                from = %last.from,
                transitions = self.machine.transition_count(),
                recent = ?self.machine.history().iter().rev().take(4).collect::<Vec<_>>(),
                "Control loop shutting down"
            );
        }

        if let Err(e) = self.channel.close().await {
            error!(error = %e, "Failed to close device channel");
        }

        match result {
            Ok(exit) => {
                info!(reason = %exit, stats = %self.stats, "Access control system stopped");
                Ok(RunReport {
                    exit,
                    stats: self.stats,
                })
            }
            Err(e) => {
                error!(error = %e, stats = %self.stats, "Control loop aborted");
                Err(e)
            }
        }
    }
}
