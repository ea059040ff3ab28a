//! Simulated device channel for testing and hardware-free operation.
//!
//! The simulated channel never touches physical I/O. Bytes "arriving from
//! the reader" are injected through a [`SimulatedChannelHandle`]; commands
//! "sent to the actuator" are recorded so callers can inspect them.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gatekeeper_core::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{ChannelError, Result};
use crate::framing::LineFramer;
use crate::traits::{ChannelInfo, ChannelKind, DeviceChannel};

/// How long `read_line` waits for injected bytes before reporting no input.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Capacity of the injected byte queue.
const FEED_CAPACITY: usize = 32;

/// State shared between the channel and its handle.
#[derive(Debug, Default)]
struct Shared {
    sent: Mutex<Vec<Command>>,
    /// Writes still to fail; `usize::MAX` means every write.
    pending_write_failures: AtomicUsize,
    pending_read_failures: AtomicUsize,
    closed: AtomicBool,
}

/// Consume one pending failure, if any.
fn take_failure(pending: &AtomicUsize) -> bool {
    pending
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
            0 => None,
            usize::MAX => Some(usize::MAX),
            n => Some(n - 1),
        })
        .is_ok()
}

/// Simulated reader/actuator link.
///
/// # Examples
///
/// ```
/// use gatekeeper_core::Command;
/// use gatekeeper_device::{DeviceChannel, SimulatedChannel};
///
/// #[tokio::main]
/// async fn main() -> gatekeeper_device::Result<()> {
///     let (mut channel, handle) = SimulatedChannel::new();
///
///     handle.present_uid("A1B2").await?;
///     assert_eq!(channel.read_line().await?.as_deref(), Some("A1B2"));
///
///     channel.send(Command::Grant).await?;
///     assert_eq!(handle.sent_commands(), vec![Command::Grant]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct SimulatedChannel {
    feed_rx: mpsc::Receiver<Vec<u8>>,
    framer: LineFramer,
    shared: Arc<Shared>,
    name: String,
    poll_interval: Duration,
    feed_closed: bool,
}

impl SimulatedChannel {
    /// Create a simulated channel with the default name and poll interval.
    pub fn new() -> (Self, SimulatedChannelHandle) {
        Self::with_name("simulator")
    }

    /// Create a simulated channel with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, SimulatedChannelHandle) {
        let (feed_tx, feed_rx) = mpsc::channel(FEED_CAPACITY);
        let shared = Arc::new(Shared::default());

        let channel = Self {
            feed_rx,
            framer: LineFramer::new(),
            shared: Arc::clone(&shared),
            name: name.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            feed_closed: false,
        };
        let handle = SimulatedChannelHandle { feed_tx, shared };

        (channel, handle)
    }

    /// Override how long a read waits for injected input.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Returns `true` once [`close`](DeviceChannel::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ChannelError::disconnected(&self.name));
        }
        Ok(())
    }
}

impl DeviceChannel for SimulatedChannel {
    async fn read_line(&mut self) -> Result<Option<String>> {
        self.ensure_open()?;

        if take_failure(&self.shared.pending_read_failures) {
            return Err(ChannelError::Io(io::Error::other("simulated read failure")));
        }

        if let Some(line) = self.framer.next_line()? {
            return Ok(Some(line));
        }

        if self.feed_closed {
            // Deliver any unterminated tail before reporting the disconnect.
            return match self.framer.finish()? {
                Some(line) => Ok(Some(line)),
                None => Err(ChannelError::disconnected(&self.name)),
            };
        }

        match tokio::time::timeout(self.poll_interval, self.feed_rx.recv()).await {
            Ok(Some(bytes)) => {
                self.framer.push(&bytes);
                self.framer.next_line()
            }
            Ok(None) => {
                debug!(channel = %self.name, "Simulated feed closed");
                self.feed_closed = true;
                Ok(None)
            }
            Err(_) => Ok(None),
        }
    }

    async fn send(&mut self, command: Command) -> Result<()> {
        self.ensure_open()?;

        if take_failure(&self.shared.pending_write_failures) {
            return Err(ChannelError::write(command, "simulated write failure"));
        }

        self.shared
            .sent
            .lock()
            .map_err(|_| ChannelError::write(command, "sent log poisoned"))?
            .push(command);
        debug!(channel = %self.name, %command, "Simulated command sent");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            self.feed_rx.close();
            info!(channel = %self.name, "Simulated channel closed");
        }
        Ok(())
    }

    fn info(&self) -> ChannelInfo {
        ChannelInfo::new(ChannelKind::Simulated, &self.name)
    }
}

/// Handle for driving a [`SimulatedChannel`].
///
/// Dropping every clone of the handle closes the feed; the channel then
/// reports [`ChannelError::Disconnected`] once its buffered input is drained.
#[derive(Debug, Clone)]
pub struct SimulatedChannelHandle {
    feed_tx: mpsc::Sender<Vec<u8>>,
    shared: Arc<Shared>,
}

impl SimulatedChannelHandle {
    /// Inject raw bytes as if the reader had sent them.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Disconnected`] if the channel was dropped or closed.
    pub async fn send_bytes(&self, bytes: impl Into<Vec<u8>>) -> Result<()> {
        self.feed_tx
            .send(bytes.into())
            .await
            .map_err(|_| ChannelError::disconnected("simulated feed"))
    }

    /// Inject one UID line, appending the terminator.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Disconnected`] if the channel was dropped or closed.
    pub async fn present_uid(&self, uid: &str) -> Result<()> {
        let mut bytes = uid.as_bytes().to_vec();
        bytes.push(b'\n');
        self.send_bytes(bytes).await
    }

    /// Every command the channel has accepted, in order.
    pub fn sent_commands(&self) -> Vec<Command> {
        self.shared
            .sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        let pending = if fail { usize::MAX } else { 0 };
        self.shared
            .pending_write_failures
            .store(pending, Ordering::SeqCst);
    }

    /// Fail only the next `count` writes.
    pub fn fail_next_writes(&self, count: usize) {
        self.shared
            .pending_write_failures
            .store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` reads with a transport error.
    pub fn fail_next_reads(&self, count: usize) {
        self.shared
            .pending_read_failures
            .store(count, Ordering::SeqCst);
    }

    /// Returns `true` once the channel has been closed by its owner.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_present_and_read() {
        let (mut channel, handle) = SimulatedChannel::new();

        handle.present_uid("A1B2").await.unwrap();
        assert_eq!(channel.read_line().await.unwrap().as_deref(), Some("A1B2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_times_out_without_input() {
        let (mut channel, _handle) = SimulatedChannel::new();
        assert_eq!(channel.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_chunks_reassembled() {
        let (mut channel, handle) = SimulatedChannel::new();

        handle.send_bytes(b"C3".to_vec()).await.unwrap();
        handle.send_bytes(b"D4\r\n".to_vec()).await.unwrap();

        assert_eq!(channel.read_line().await.unwrap(), None);
        assert_eq!(channel.read_line().await.unwrap().as_deref(), Some("C3D4"));
    }

    #[tokio::test]
    async fn test_sent_commands_recorded() {
        let (mut channel, handle) = SimulatedChannel::new();

        channel.send(Command::Grant).await.unwrap();
        channel.send(Command::Fault).await.unwrap();
        channel.send(Command::Deny).await.unwrap();

        assert_eq!(
            handle.sent_commands(),
            vec![Command::Grant, Command::Fault, Command::Deny]
        );
    }

    #[tokio::test]
    async fn test_write_failure_toggle() {
        let (mut channel, handle) = SimulatedChannel::new();

        handle.set_fail_writes(true);
        let error = channel.send(Command::Deny).await.unwrap_err();
        assert!(matches!(error, ChannelError::Write { command: Command::Deny, .. }));

        handle.set_fail_writes(false);
        channel.send(Command::Deny).await.unwrap();
        assert_eq!(handle.sent_commands(), vec![Command::Deny]);
    }

    #[tokio::test]
    async fn test_fail_next_writes() {
        let (mut channel, handle) = SimulatedChannel::new();

        handle.fail_next_writes(1);
        assert!(channel.send(Command::Grant).await.is_err());
        channel.send(Command::Deny).await.unwrap();

        assert_eq!(handle.sent_commands(), vec![Command::Deny]);
    }

    #[tokio::test]
    async fn test_fail_next_reads() {
        let (mut channel, handle) = SimulatedChannel::new();

        handle.present_uid("A1B2").await.unwrap();
        handle.fail_next_reads(1);

        let error = channel.read_line().await.unwrap_err();
        assert!(matches!(error, ChannelError::Io(_)));
        assert!(!error.is_decode_error());
        assert!(!error.is_disconnected());

        assert_eq!(channel.read_line().await.unwrap().as_deref(), Some("A1B2"));
    }

    #[tokio::test]
    async fn test_dropped_handle_disconnects_after_drain() {
        let (mut channel, handle) = SimulatedChannel::new();

        handle.send_bytes(b"A1\nB2".to_vec()).await.unwrap();
        drop(handle);

        assert_eq!(channel.read_line().await.unwrap().as_deref(), Some("A1"));
        assert_eq!(channel.read_line().await.unwrap(), None);
        assert_eq!(channel.read_line().await.unwrap().as_deref(), Some("B2"));
        assert!(channel.read_line().await.unwrap_err().is_disconnected());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let (mut channel, handle) = SimulatedChannel::new();

        channel.close().await.unwrap();
        channel.close().await.unwrap();

        assert!(channel.is_closed());
        assert!(handle.is_closed());
        assert!(channel.read_line().await.unwrap_err().is_disconnected());
        assert!(channel.send(Command::Grant).await.unwrap_err().is_disconnected());
        assert!(handle.present_uid("A1").await.is_err());
    }
}
