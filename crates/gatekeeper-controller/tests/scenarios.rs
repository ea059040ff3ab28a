//! End-to-end access scenarios: evaluation, dispatch and both loop modes
//! driven through the simulated device channel.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use gatekeeper_controller::{ExitReason, Gatekeeper, READ_ERROR_BACKOFF, dispatch, evaluate};
use gatekeeper_core::{CardholderRecord, Command, FixedClock, Uid, Verdict};
use gatekeeper_device::{SimulatedChannel, SimulatedChannelHandle};
use gatekeeper_roster::Roster;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn record(uid: &str, name: &str, expiry: NaiveDateTime) -> CardholderRecord {
    CardholderRecord::new(Uid::parse(uid).unwrap(), name, expiry)
}

fn office_roster() -> Roster {
    Roster::from_records([
        record("A1B2", "Ivanov", date(2099, 1, 1)),
        record("C3D4", "Petrov", date(2020, 1, 1)),
    ])
    .unwrap()
}

fn gatekeeper() -> (Gatekeeper<SimulatedChannel, FixedClock>, SimulatedChannelHandle) {
    let (channel, handle) = SimulatedChannel::new();
    let channel = channel.with_poll_interval(Duration::from_millis(10));
    let gatekeeper = Gatekeeper::with_clock(office_roster(), channel, FixedClock(date(2030, 1, 1)));
    (gatekeeper, handle)
}

/// Wait until the channel has accepted `count` commands, then cancel.
async fn cancel_after(handle: &SimulatedChannelHandle, count: usize, token: &CancellationToken) {
    while handle.sent_commands().len() < count {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    token.cancel();
}

#[tokio::test]
async fn test_valid_card_is_granted() {
    let roster = Roster::from_records([record("A1B2", "Ivanov", date(2099, 1, 1))]).unwrap();
    let (mut channel, handle) = SimulatedChannel::new();

    let verdict = evaluate(" A1B2 ", date(2030, 1, 1), &roster);
    assert_eq!(verdict, Verdict::Granted { name: "Ivanov".into() });

    dispatch("A1B2", &verdict, &mut channel).await.unwrap();
    assert_eq!(handle.sent_commands(), vec![Command::Grant]);
}

#[tokio::test]
async fn test_expired_card_faults() {
    let roster = Roster::from_records([record("C3D4", "Petrov", date(2020, 1, 1))]).unwrap();
    let (mut channel, handle) = SimulatedChannel::new();

    let verdict = evaluate("C3D4", date(2030, 1, 1), &roster);
    assert_eq!(verdict, Verdict::DeniedExpired { name: "Petrov".into() });

    dispatch("C3D4", &verdict, &mut channel).await.unwrap();
    assert_eq!(handle.sent_commands(), vec![Command::Fault]);
}

#[tokio::test]
async fn test_unknown_card_is_denied() {
    let roster = Roster::default();
    let (mut channel, handle) = SimulatedChannel::new();

    let verdict = evaluate("ZZZZ", date(2030, 1, 1), &roster);
    assert_eq!(verdict, Verdict::DeniedUnknown);

    dispatch("ZZZZ", &verdict, &mut channel).await.unwrap();
    assert_eq!(handle.sent_commands(), vec![Command::Deny]);
}

#[tokio::test]
async fn test_simulation_exit_keyword_stops_without_dispatch() {
    for keyword in ["exit", "EXIT", "  Exit  "] {
        let (mut gatekeeper, handle) = gatekeeper();
        let input = format!("{keyword}\nA1B2\n");

        let mut console = Vec::new();
        let report = gatekeeper
            .run_simulation(input.as_bytes(), &mut console, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.exit, ExitReason::ExitRequested);
        assert!(report.exit.is_clean());
        assert_eq!(report.stats.evaluated(), 0);
        assert!(handle.sent_commands().is_empty());
        assert!(handle.is_closed());
    }
}

#[tokio::test]
async fn test_simulation_session() {
    let (mut gatekeeper, handle) = gatekeeper();
    let input = " A1B2 \nC3D4\nZZZZ\n\nexit\nA1B2\n";

    let mut console = Vec::new();
    let report = gatekeeper
        .run_simulation(input.as_bytes(), &mut console, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        handle.sent_commands(),
        vec![Command::Grant, Command::Fault, Command::Deny]
    );
    assert_eq!(report.stats.granted, 1);
    assert_eq!(report.stats.faulted, 1);
    assert_eq!(report.stats.denied, 1);
    assert_eq!(report.stats.ignored, 1);

    let console = String::from_utf8(console).unwrap();
    assert!(console.contains("[SIM] sending command: GRANT\nAccess granted for: Ivanov"));
    assert!(console.contains("[SIM] sending command: FAULT\nAccess denied! Card of Petrov has expired"));
    assert!(console.contains("[SIM] sending command: DENY\nCard not found in roster"));
}

#[tokio::test]
async fn test_simulation_end_of_input() {
    let (mut gatekeeper, handle) = gatekeeper();

    let report = gatekeeper
        .run_simulation(&b"A1B2"[..], Vec::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.exit, ExitReason::InputClosed);
    assert_eq!(handle.sent_commands(), vec![Command::Grant]);
}

#[tokio::test]
async fn test_simulation_write_failure_is_reported() {
    let (mut gatekeeper, handle) = gatekeeper();
    handle.set_fail_writes(true);

    let mut console = Vec::new();
    let report = gatekeeper
        .run_simulation(&b"A1B2\nexit\n"[..], &mut console, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.exit, ExitReason::ExitRequested);
    assert_eq!(report.stats.write_errors, 1);
    assert_eq!(report.stats.granted, 1);

    let console = String::from_utf8(console).unwrap();
    assert!(console.contains("Error sending command"));
}

#[tokio::test]
async fn test_simulation_cancelled_while_waiting() {
    let (mut gatekeeper, handle) = gatekeeper();
    let (_operator, stdin) = tokio::io::duplex(64);
    let token = CancellationToken::new();

    let canceller = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    };
    let (report, ()) = tokio::join!(
        gatekeeper.run_simulation(BufReader::new(stdin), Vec::new(), &token),
        canceller
    );

    assert_eq!(report.unwrap().exit, ExitReason::Cancelled);
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_live_blank_lines_are_ignored() {
    let (mut gatekeeper, handle) = gatekeeper();
    let token = CancellationToken::new();

    handle.send_bytes(b"\n   \r\nA1B2\n".to_vec()).await.unwrap();
    let (report, ()) = tokio::join!(
        gatekeeper.run_live(&token),
        cancel_after(&handle, 1, &token)
    );
    let report = report.unwrap();

    assert_eq!(report.exit, ExitReason::Cancelled);
    assert_eq!(report.stats.ignored, 2);
    assert_eq!(report.stats.evaluated(), 1);
    assert_eq!(handle.sent_commands(), vec![Command::Grant]);
}

#[tokio::test]
async fn test_live_uids_split_across_reads() {
    let (mut gatekeeper, handle) = gatekeeper();
    let token = CancellationToken::new();

    let feeder = async {
        handle.send_bytes(b"C3".to_vec()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        handle.send_bytes(b"D4\r\nZZ".to_vec()).await.unwrap();
        handle.send_bytes(b"ZZ\n".to_vec()).await.unwrap();
        cancel_after(&handle, 2, &token).await;
    };
    let (report, ()) = tokio::join!(gatekeeper.run_live(&token), feeder);

    assert_eq!(report.unwrap().exit, ExitReason::Cancelled);
    assert_eq!(handle.sent_commands(), vec![Command::Fault, Command::Deny]);
}

#[tokio::test]
async fn test_live_write_failure_does_not_stop_loop() {
    let (mut gatekeeper, handle) = gatekeeper();
    let token = CancellationToken::new();

    let feeder = async {
        handle.fail_next_writes(1);
        handle.present_uid("A1B2").await.unwrap();
        handle.present_uid("ZZZZ").await.unwrap();
        cancel_after(&handle, 1, &token).await;
    };
    let (report, ()) = tokio::join!(gatekeeper.run_live(&token), feeder);
    let report = report.unwrap();

    assert_eq!(report.stats.write_errors, 1);
    assert_eq!(report.stats.granted, 1);
    assert_eq!(report.stats.denied, 1);
    assert_eq!(handle.sent_commands(), vec![Command::Deny]);
}

#[tokio::test]
async fn test_live_decode_error_is_skipped() {
    let (mut gatekeeper, handle) = gatekeeper();
    let token = CancellationToken::new();

    handle.send_bytes(b"\xff\xfe\nA1B2\n".to_vec()).await.unwrap();
    let (report, ()) = tokio::join!(
        gatekeeper.run_live(&token),
        cancel_after(&handle, 1, &token)
    );
    let report = report.unwrap();

    assert_eq!(report.stats.read_errors, 1);
    assert_eq!(handle.sent_commands(), vec![Command::Grant]);
}

#[tokio::test(start_paused = true)]
async fn test_live_transport_error_backs_off() {
    let (mut gatekeeper, handle) = gatekeeper();
    let token = CancellationToken::new();

    handle.fail_next_reads(1);
    handle.present_uid("A1B2").await.unwrap();
    let start = tokio::time::Instant::now();

    let watcher = async {
        cancel_after(&handle, 1, &token).await;
        start.elapsed()
    };
    let (report, elapsed) = tokio::join!(gatekeeper.run_live(&token), watcher);
    let report = report.unwrap();

    assert_eq!(report.exit, ExitReason::Cancelled);
    assert_eq!(report.stats.read_errors, 1);
    assert_eq!(report.stats.granted, 1);
    assert!(elapsed >= READ_ERROR_BACKOFF);
}

#[tokio::test(start_paused = true)]
async fn test_live_cancelled_during_read_backoff() {
    let (mut gatekeeper, handle) = gatekeeper();
    let token = CancellationToken::new();

    handle.fail_next_reads(1);
    handle.present_uid("A1B2").await.unwrap();

    let canceller = async {
        tokio::time::sleep(READ_ERROR_BACKOFF / 2).await;
        token.cancel();
    };
    let (report, ()) = tokio::join!(gatekeeper.run_live(&token), canceller);
    let report = report.unwrap();

    assert_eq!(report.exit, ExitReason::Cancelled);
    assert_eq!(report.stats.read_errors, 1);
    assert_eq!(report.stats.evaluated(), 0);
    assert!(handle.sent_commands().is_empty());
}

#[tokio::test]
async fn test_live_channel_loss_ends_run() {
    let (mut gatekeeper, handle) = gatekeeper();

    handle.present_uid("A1B2").await.unwrap();
    drop(handle);

    let report = gatekeeper.run_live(&CancellationToken::new()).await.unwrap();

    assert!(matches!(report.exit, ExitReason::ChannelLost(_)));
    assert!(!report.exit.is_clean());
    assert_eq!(report.stats.granted, 1);
    assert!(gatekeeper.channel().is_closed());
}
