//! Device channel trait definition.
//!
//! The channel is the gatekeeper's only link to the reader/actuator board:
//! UIDs come in as newline-terminated ASCII lines, commands go out the same
//! way. Methods use native `async fn` in traits (Edition 2024 RPITIT); for
//! runtime selection between bindings use [`AnyChannel`](crate::AnyChannel).

#![allow(async_fn_in_trait)]

use std::fmt;

use gatekeeper_core::Command;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of binding behind a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Serial,
    Simulated,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Serial => write!(f, "serial"),
            ChannelKind::Simulated => write!(f, "simulated"),
        }
    }
}

/// Descriptive metadata about an open channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub kind: ChannelKind,

    /// Port name for serial bindings, a label for simulated ones.
    pub name: String,

    /// Baud rate, when the binding has one.
    pub baud_rate: Option<u32>,
}

impl ChannelInfo {
    pub fn new(kind: ChannelKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            baud_rate: None,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }
}

impl fmt::Display for ChannelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.baud_rate {
            Some(baud) => write!(f, "{} {} @ {} baud", self.kind, self.name, baud),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// Duplex line-oriented link to the reader/actuator.
///
/// A channel is owned exclusively by the control loop and used
/// sequentially. Implementations must bound how long [`read_line`] blocks so
/// the caller can observe cancellation between reads.
///
/// [`read_line`]: DeviceChannel::read_line
///
/// # Examples
///
/// ```no_run
/// use gatekeeper_core::Command;
/// use gatekeeper_device::{DeviceChannel, Result};
///
/// async fn echo_deny<C: DeviceChannel>(channel: &mut C) -> Result<()> {
///     if let Some(line) = channel.read_line().await? {
///         println!("reader sent {line}");
///         channel.send(Command::Deny).await?;
///     }
///     Ok(())
/// }
/// ```
pub trait DeviceChannel: Send {
    /// Wait a bounded time for one complete input line.
    ///
    /// Returns `Ok(None)` if no complete line arrived within the channel's
    /// poll window. The line is returned without its terminator but is not
    /// otherwise trimmed.
    ///
    /// # Errors
    ///
    /// Returns a decode error for malformed lines, an I/O error for transport
    /// hiccups, and [`ChannelError::Disconnected`] once the device is gone.
    ///
    /// [`ChannelError::Disconnected`]: crate::ChannelError::Disconnected
    async fn read_line(&mut self) -> Result<Option<String>>;

    /// Send a newline-terminated command token.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Write`](crate::ChannelError::Write) if the
    /// bytes could not be written.
    async fn send(&mut self, command: Command) -> Result<()>;

    /// Release the underlying transport. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport reports a failure while closing.
    async fn close(&mut self) -> Result<()>;

    /// Metadata about this channel.
    fn info(&self) -> ChannelInfo;
}
