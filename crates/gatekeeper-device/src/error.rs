//! Error types for device channel operations.
//!
//! Open failures are fatal at startup. Read and write failures are scoped
//! to a single UID cycle; the control loop logs them and carries on, except
//! for [`ChannelError::Disconnected`], after which the channel is unusable.

use gatekeeper_core::Command;

/// Result type alias for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors that can occur on a device channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The transport could not be opened.
    #[error("Failed to open {port}: {message}")]
    Open { port: String, message: String },

    /// A line arrived but could not be decoded as text.
    #[error("Undecodable input: {message}")]
    Decode { message: String },

    /// A line exceeded the maximum accepted length.
    #[error("Input line exceeds {max} bytes")]
    LineTooLong { max: usize },

    /// A command could not be written.
    #[error("Failed to send {command}: {message}")]
    Write { command: Command, message: String },

    /// The channel is closed or the device went away.
    #[error("Channel disconnected: {device}")]
    Disconnected { device: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Create a new open error.
    pub fn open(port: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Open {
            port: port.into(),
            message: message.to_string(),
        }
    }

    /// Create a new decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a new write error.
    pub fn write(command: Command, message: impl std::fmt::Display) -> Self {
        Self::Write {
            command,
            message: message.to_string(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Returns `true` if the channel can no longer be used.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }

    /// Returns `true` for malformed input, as opposed to transport failure.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::LineTooLong { .. })
    }
}
