//! Access decision.
//!
//! Pure function of the presented UID, the reference time and the roster.
//! No I/O happens here, which keeps the decision trivially testable.

use chrono::NaiveDateTime;
use gatekeeper_core::Verdict;
use gatekeeper_roster::Roster;

/// Decide whether the card `uid` may pass at `now`.
///
/// The UID is trimmed before lookup. A card is granted only if it is on the
/// roster and `now` is strictly before its expiry.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use gatekeeper_controller::evaluate;
/// use gatekeeper_core::{CardholderRecord, Uid, Verdict};
/// use gatekeeper_roster::Roster;
///
/// let expiry = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let roster = Roster::from_records([CardholderRecord::new(
///     Uid::parse("A1B2").unwrap(),
///     "Ivanov",
///     expiry,
/// )])
/// .unwrap();
///
/// let now = NaiveDate::from_ymd_opt(2029, 6, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// assert_eq!(
///     evaluate(" A1B2 ", now, &roster),
///     Verdict::Granted { name: "Ivanov".into() }
/// );
/// assert_eq!(evaluate("FFFF", now, &roster), Verdict::DeniedUnknown);
/// ```
pub fn evaluate(uid: &str, now: NaiveDateTime, roster: &Roster) -> Verdict {
    match roster.lookup(uid) {
        None => Verdict::DeniedUnknown,
        Some(record) if record.is_valid_at(now) => Verdict::Granted {
            name: record.name.clone(),
        },
        Some(record) => Verdict::DeniedExpired {
            name: record.name.clone(),
        },
    }
}
