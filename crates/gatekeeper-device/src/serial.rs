//! Serial-port binding of the device channel.
//!
//! `serialport` is a blocking API. Each read and write runs on Tokio's
//! blocking pool so the control loop's future stays responsive to
//! cancellation; the port's read timeout bounds how long a blocking read can
//! outlive a cancelled future.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gatekeeper_core::Command;
use gatekeeper_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS, DEFAULT_SETTLE_DELAY_MS, default_serial_port,
};
use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::{ChannelError, Result};
use crate::framing::LineFramer;
use crate::traits::{ChannelInfo, ChannelKind, DeviceChannel};

/// Bytes requested from the port per read.
const READ_CHUNK_SIZE: usize = 64;

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// Serial port settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,

    pub baud_rate: u32,

    /// Upper bound on a single blocking read.
    pub read_timeout_ms: u64,

    /// Pause after opening before the board is expected to talk.
    pub settle_delay_ms: u64,
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port().to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

/// Device channel over a physical serial port.
pub struct SerialChannel {
    port: Option<SharedPort>,
    framer: LineFramer,
    config: SerialConfig,
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("port", &self.config.port)
            .field("open", &self.port.is_some())
            .field("pending", &self.framer.pending())
            .finish()
    }
}

impl SerialChannel {
    /// Open the port.
    ///
    /// The board resets when the port opens; call [`settle`](Self::settle)
    /// before the first read.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Open`] if the port cannot be opened.
    pub fn open(config: SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| ChannelError::open(&config.port, e))?;

        info!(
            port = %config.port,
            baud_rate = config.baud_rate,
            timeout_ms = config.read_timeout_ms,
            "Serial port opened"
        );

        Ok(Self {
            port: Some(Arc::new(Mutex::new(port))),
            framer: LineFramer::new(),
            config,
        })
    }

    /// Wait out the configured settle delay.
    ///
    /// Returns `false` if `shutdown` fired first.
    pub async fn settle(&self, shutdown: &CancellationToken) -> bool {
        wait_settle(self.config.settle_delay(), shutdown).await
    }

    /// Settings the port was opened with.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn shared_port(&self) -> Result<SharedPort> {
        self.port
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| ChannelError::disconnected(&self.config.port))
    }
}

async fn wait_settle(delay: Duration, shutdown: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !shutdown.is_cancelled();
    }

    debug!(delay_ms = delay.as_millis(), "Waiting for reader to settle");
    tokio::select! {
        biased;
        () = shutdown.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

/// Blocking read of whatever the port has, up to its timeout.
///
/// A timeout is not an error; it yields an empty chunk.
fn read_chunk(port: &SharedPort) -> io::Result<Vec<u8>> {
    let mut port = port
        .lock()
        .map_err(|_| io::Error::other("serial port lock poisoned"))?;
    let mut buf = [0u8; READ_CHUNK_SIZE];
    match port.read(&mut buf) {
        Ok(n) => Ok(buf[..n].to_vec()),
        Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

fn write_all(port: &SharedPort, bytes: &[u8]) -> io::Result<()> {
    let mut port = port
        .lock()
        .map_err(|_| io::Error::other("serial port lock poisoned"))?;
    port.write_all(bytes)?;
    port.flush()
}

fn is_gone(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected | io::ErrorKind::NotFound
    )
}

impl DeviceChannel for SerialChannel {
    async fn read_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.framer.next_line()? {
            return Ok(Some(line));
        }

        let port = self.shared_port()?;
        let chunk = tokio::task::spawn_blocking(move || read_chunk(&port))
            .await
            .map_err(|e| ChannelError::Io(io::Error::other(e)))?;

        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) if is_gone(&e) => return Err(ChannelError::disconnected(&self.config.port)),
            Err(e) => return Err(ChannelError::Io(e)),
        };

        if !chunk.is_empty() {
            trace!(bytes = chunk.len(), "Serial chunk received");
            self.framer.push(&chunk);
        }
        self.framer.next_line()
    }

    async fn send(&mut self, command: Command) -> Result<()> {
        let port = self.shared_port()?;
        let wire = command.to_wire();

        tokio::task::spawn_blocking(move || write_all(&port, &wire))
            .await
            .map_err(|e| ChannelError::write(command, e))?
            .map_err(|e| ChannelError::write(command, e))?;

        trace!(%command, "Command written to serial port");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            info!(port = %self.config.port, "Serial port closed");
        }
        Ok(())
    }

    fn info(&self) -> ChannelInfo {
        ChannelInfo::new(ChannelKind::Serial, &self.config.port)
            .with_baud_rate(self.config.baud_rate)
    }
}
