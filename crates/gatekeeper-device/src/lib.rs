//! Device channel abstraction for the gatekeeper.
//!
//! The gatekeeper talks to a single reader/actuator board over a duplex,
//! newline-delimited ASCII link. UIDs arrive one per line; the gatekeeper
//! answers with `GRANT`, `DENY` or `FAULT`. This crate hides whether that
//! link is a real serial port or a simulation.
//!
//! # Bindings
//!
//! - [`SerialChannel`]: physical port via `serialport`, blocking I/O moved to
//!   Tokio's blocking pool, bounded by the port's read timeout.
//! - [`SimulatedChannel`]: in-process stand-in driven by a
//!   [`SimulatedChannelHandle`], used by simulation mode and tests.
//!
//! Both implement [`DeviceChannel`]; [`AnyChannel`] selects between them at
//! runtime.
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`] with [`ChannelError`]. Opening is the
//! only fatal failure; read and write errors are reported per call.

pub mod devices;
pub mod error;
pub mod framing;
pub mod serial;
pub mod simulated;
pub mod traits;

pub use devices::AnyChannel;
pub use error::{ChannelError, Result};
pub use framing::LineFramer;
pub use serial::{SerialChannel, SerialConfig};
pub use simulated::{SimulatedChannel, SimulatedChannelHandle};
pub use traits::{ChannelInfo, ChannelKind, DeviceChannel};
