//! Deadline derivation from order codes.
//!
//! The first 8 characters of an order code are the order date as
//! `YYYYMMDD`. The change deadline is that date plus two calendar days at
//! 06:00 local time.

use chrono::{DateTime, Days, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;

/// Calendar days between the order date and its deadline.
pub const DEADLINE_OFFSET_DAYS: u64 = 2;

/// Local hour of day at which the deadline falls.
pub const DEADLINE_HOUR: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeadlineError {
    #[error("malformed order code {code:?}: {reason}")]
    MalformedOrderCode { code: String, reason: String },
}

fn malformed(code: &str, reason: impl Into<String>) -> DeadlineError {
    DeadlineError::MalformedOrderCode {
        code: code.to_string(),
        reason: reason.into(),
    }
}

/// Parse the `YYYYMMDD` prefix of an order code.
pub fn order_date(order_code: &str) -> Result<NaiveDate, DeadlineError> {
    let prefix = order_code
        .get(..8)
        .ok_or_else(|| malformed(order_code, "shorter than 8 characters"))?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(order_code, "date prefix is not numeric"));
    }

    let year: i32 = prefix[0..4].parse().map_err(|_| malformed(order_code, "bad year"))?;
    let month: u32 = prefix[4..6].parse().map_err(|_| malformed(order_code, "bad month"))?;
    let day: u32 = prefix[6..8].parse().map_err(|_| malformed(order_code, "bad day"))?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        malformed(
            order_code,
            format!("{year:04}-{month:02}-{day:02} is not a calendar date"),
        )
    })
}

/// Deadline for an order code in time zone `tz`.
///
/// See [`resolve_local`] for deadlines that fall on a DST transition.
pub fn deadline_for(order_code: Option<&str>, tz: Tz) -> Result<DateTime<Tz>, DeadlineError> {
    let code = order_code.ok_or_else(|| malformed("", "order code is missing"))?;
    let date = order_date(code)?;

    let deadline_date = date
        .checked_add_days(Days::new(DEADLINE_OFFSET_DAYS))
        .ok_or_else(|| malformed(code, "date out of range"))?;
    let time = NaiveTime::from_hms_opt(DEADLINE_HOUR, 0, 0)
        .ok_or_else(|| malformed(code, "invalid deadline time"))?;
    let local = NaiveDateTime::new(deadline_date, time);

    resolve_local(local, tz).ok_or_else(|| malformed(code, "deadline does not exist in local time"))
}

/// Map a wall-clock time in `tz` to an instant.
///
/// A time inside a DST gap moves forward one hour; an ambiguous time resolves
/// to the earlier instant.
pub fn resolve_local(local: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(local + chrono::Duration::hours(1)))
            .earliest(),
    }
}
