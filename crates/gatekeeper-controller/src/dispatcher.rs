//! Verdict to actuator command.
//!
//! Every evaluated UID produces exactly one command on the channel and one
//! log entry describing the decision.

use gatekeeper_core::{Command, Verdict};
use gatekeeper_device::{ChannelError, DeviceChannel};
use tracing::{info, warn};

/// Log the decision for `uid` and send the matching command on `channel`.
///
/// | Verdict         | Command | Log level |
/// |-----------------|---------|-----------|
/// | `Granted`       | `GRANT` | info      |
/// | `DeniedExpired` | `FAULT` | warn      |
/// | `DeniedUnknown` | `DENY`  | warn      |
///
/// # Errors
///
/// Returns the channel's error if the command could not be written. The
/// decision is logged before the write is attempted, so a failed write still
/// leaves an audit entry.
pub async fn dispatch<C: DeviceChannel>(
    uid: &str,
    verdict: &Verdict,
    channel: &mut C,
) -> Result<Command, ChannelError> {
    let command = Command::from(verdict);

    match verdict {
        Verdict::Granted { name } => {
            info!(uid, holder = %name, %command, "Access granted");
        }
        Verdict::DeniedExpired { name } => {
            warn!(uid, holder = %name, %command, "Access denied, card expired");
        }
        Verdict::DeniedUnknown => {
            warn!(uid, %command, "Access denied, card not found");
        }
    }

    channel.send(command).await?;
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_device::SimulatedChannel;
    use rstest::rstest;

    #[rstest]
    #[case(Verdict::Granted { name: "Ivanov".into() }, Command::Grant)]
    #[case(Verdict::DeniedExpired { name: "Petrov".into() }, Command::Fault)]
    #[case(Verdict::DeniedUnknown, Command::Deny)]
    #[tokio::test]
    async fn test_dispatch_sends_one_command(#[case] verdict: Verdict, #[case] expected: Command) {
        let (mut channel, handle) = SimulatedChannel::new();

        let sent = dispatch("A1B2", &verdict, &mut channel).await.unwrap();

        assert_eq!(sent, expected);
        assert_eq!(handle.sent_commands(), vec![expected]);
    }

    #[tokio::test]
    async fn test_dispatch_reports_write_failure() {
        let (mut channel, handle) = SimulatedChannel::new();
        handle.set_fail_writes(true);

        let error = dispatch("A1B2", &Verdict::DeniedUnknown, &mut channel)
            .await
            .unwrap_err();

        assert!(matches!(error, ChannelError::Write { command: Command::Deny, .. }));
        assert!(handle.sent_commands().is_empty());
    }
}
