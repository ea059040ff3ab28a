//! Newline framing of the reader's byte stream.
//!
//! Serial reads return whatever bytes happen to be available, so a UID may
//! arrive split across several reads, or several UIDs may arrive in one.
//! [`LineFramer`] buffers the bytes and yields complete lines.

use bytes::BytesMut;
use gatekeeper_core::constants::MAX_UID_LINE_LENGTH;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::error::{ChannelError, Result};

/// Accumulates raw bytes and splits them into `\n`-terminated lines.
///
/// A trailing `\r` is stripped and does not count toward the maximum length.
/// Lines that are not valid UTF-8 or exceed the maximum length are reported
/// as errors and dropped; framing resumes at the next newline.
#[derive(Debug)]
pub struct LineFramer {
    codec: LinesCodec,
    buffer: BytesMut,
    max_length: usize,
}

impl LineFramer {
    /// Create a framer with the default maximum line length.
    pub fn new() -> Self {
        Self::with_max_length(MAX_UID_LINE_LENGTH)
    }

    /// Create a framer with a custom maximum line length.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            // One spare byte for the `\r` of a CRLF terminator.
            codec: LinesCodec::new_with_max_length(max_length.saturating_add(1)),
            buffer: BytesMut::with_capacity(max_length),
            max_length,
        }
    }

    /// Append bytes received from the transport.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Take the next complete line, if one is buffered.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Decode`] for invalid UTF-8 and
    /// [`ChannelError::LineTooLong`] for oversized lines. The offending bytes
    /// are consumed either way.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        let line = self
            .codec
            .decode(&mut self.buffer)
            .map_err(|e| self.map_error(e))?;
        self.check_length(line)
    }

    /// Flush a final unterminated line once the stream has ended.
    ///
    /// # Errors
    ///
    /// Same as [`next_line`](Self::next_line).
    pub fn finish(&mut self) -> Result<Option<String>> {
        let line = self
            .codec
            .decode_eof(&mut self.buffer)
            .map_err(|e| self.map_error(e))?;
        self.check_length(line)
    }

    /// Number of bytes waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn check_length(&self, line: Option<String>) -> Result<Option<String>> {
        match line {
            Some(line) if line.len() > self.max_length => Err(ChannelError::LineTooLong {
                max: self.max_length,
            }),
            line => Ok(line),
        }
    }

    fn map_error(&self, error: LinesCodecError) -> ChannelError {
        match error {
            LinesCodecError::MaxLineLengthExceeded => ChannelError::LineTooLong {
                max: self.max_length,
            },
            LinesCodecError::Io(e) => ChannelError::decode(e.to_string()),
        }
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}
