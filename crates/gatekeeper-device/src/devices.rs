//! Enum wrapper for runtime selection of a channel binding.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn DeviceChannel>`
//! is not available. [`AnyChannel`] gives the entry point a single concrete
//! type covering every binding, dispatched with a `match`.

use gatekeeper_core::Command;

use crate::error::Result;
use crate::serial::SerialChannel;
use crate::simulated::SimulatedChannel;
use crate::traits::{ChannelInfo, DeviceChannel};

/// Any supported device channel.
///
/// # Examples
///
/// ```
/// use gatekeeper_device::{AnyChannel, ChannelKind, DeviceChannel, SimulatedChannel};
///
/// let (channel, _handle) = SimulatedChannel::new();
/// let channel = AnyChannel::Simulated(channel);
/// assert_eq!(channel.info().kind, ChannelKind::Simulated);
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyChannel {
    /// Physical reader on a serial port.
    Serial(SerialChannel),

    /// Hardware-free stand-in.
    Simulated(SimulatedChannel),
}

impl DeviceChannel for AnyChannel {
    async fn read_line(&mut self) -> Result<Option<String>> {
        match self {
            Self::Serial(channel) => channel.read_line().await,
            Self::Simulated(channel) => channel.read_line().await,
        }
    }

    async fn send(&mut self, command: Command) -> Result<()> {
        match self {
            Self::Serial(channel) => channel.send(command).await,
            Self::Simulated(channel) => channel.send(command).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Serial(channel) => channel.close().await,
            Self::Simulated(channel) => channel.close().await,
        }
    }

    fn info(&self) -> ChannelInfo {
        match self {
            Self::Serial(channel) => channel.info(),
            Self::Simulated(channel) => channel.info(),
        }
    }
}

impl From<SerialChannel> for AnyChannel {
    fn from(channel: SerialChannel) -> Self {
        Self::Serial(channel)
    }
}

impl From<SimulatedChannel> for AnyChannel {
    fn from(channel: SimulatedChannel) -> Self {
        Self::Simulated(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ChannelKind;

    #[tokio::test]
    async fn test_dispatch_to_simulated() {
        let (channel, handle) = SimulatedChannel::with_name("bench");
        let mut channel = AnyChannel::from(channel);

        handle.present_uid("A1B2").await.unwrap();
        assert_eq!(channel.read_line().await.unwrap().as_deref(), Some("A1B2"));

        channel.send(Command::Grant).await.unwrap();
        assert_eq!(handle.sent_commands(), vec![Command::Grant]);

        let info = channel.info();
        assert_eq!(info.kind, ChannelKind::Simulated);
        assert_eq!(info.name, "bench");

        channel.close().await.unwrap();
        assert!(handle.is_closed());
    }
}
