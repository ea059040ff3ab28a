//! Wire-level and operational constants.
//!
//! The actuator firmware understands exactly three newline-terminated ASCII
//! tokens. Changing any of them breaks compatibility with deployed readers.

// ============================================================================
// Command Vocabulary
// ============================================================================

/// Token sent when the cardholder is admitted.
pub const TOKEN_GRANT: &str = "GRANT";

/// Token sent when the card is not on the roster.
pub const TOKEN_DENY: &str = "DENY";

/// Token sent when the card is on the roster but has expired.
pub const TOKEN_FAULT: &str = "FAULT";

/// Terminator appended to every outgoing command and expected after every UID.
pub const LINE_TERMINATOR: u8 = b'\n';

// ============================================================================
// Framing
// ============================================================================

/// Longest UID line accepted from the reader, terminator excluded.
///
/// Real readers emit at most 20 characters; anything much longer is line
/// noise and is discarded as a read error.
pub const MAX_UID_LINE_LENGTH: usize = 256;

// ============================================================================
// Serial Defaults
// ============================================================================

/// Default serial port on Unix-like hosts.
pub const DEFAULT_SERIAL_PORT_UNIX: &str = "/dev/ttyUSB0";

/// Default serial port on Windows hosts.
pub const DEFAULT_SERIAL_PORT_WINDOWS: &str = "COM3";

/// Default baud rate of the reader board.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default serial read timeout in milliseconds.
///
/// Bounds how long a single read may block, which in turn bounds how long a
/// shutdown request can go unnoticed.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Default delay after opening the port before the first read.
///
/// Arduino-class boards reset when DTR toggles on open and need about two
/// seconds before they talk.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;

/// Literal accepted in simulation mode to leave the loop (case-insensitive).
pub const EXIT_KEYWORD: &str = "exit";

/// Platform default serial port.
#[must_use]
pub fn default_serial_port() -> &'static str {
    if cfg!(windows) {
        DEFAULT_SERIAL_PORT_WINDOWS
    } else {
        DEFAULT_SERIAL_PORT_UNIX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_distinct_ascii() {
        let tokens = [TOKEN_GRANT, TOKEN_DENY, TOKEN_FAULT];
        for token in tokens {
            assert!(token.is_ascii());
            assert!(!token.contains('\n'));
        }
        assert_ne!(TOKEN_GRANT, TOKEN_DENY);
        assert_ne!(TOKEN_DENY, TOKEN_FAULT);
        assert_ne!(TOKEN_GRANT, TOKEN_FAULT);
    }

    #[test]
    fn test_default_port_matches_platform() {
        let port = default_serial_port();
        if cfg!(windows) {
            assert_eq!(port, "COM3");
        } else {
            assert_eq!(port, "/dev/ttyUSB0");
        }
    }
}
