//! Cron timing for the sweep loop.
//!
//! Expressions are evaluated in the configured time zone, so `0 * * * *`
//! fires on the local hour and `0 6 * * *` at 06:00 local.

use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;

/// First fire time strictly after `after`.
pub fn next_fire(schedule: &Schedule, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    schedule
        .after(&after.with_timezone(&tz))
        .next()
        .map(|t| t.with_timezone(&Utc))
}

/// How long to sleep from `now` until `next`; zero if already due.
pub fn delay_until(next: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use duewatch_core::config::SweepConfig;

    fn parse_schedule(expr: &str) -> Result<Schedule, duewatch_core::DuewatchError> {
        SweepConfig {
            cron: expr.to_string(),
            timezone: "UTC".to_string(),
            concurrency: 1,
            dispatch_timeout_secs: 1,
        }
        .schedule()
    }

    #[test]
    fn hourly_fires_on_the_hour() {
        let schedule = parse_schedule("0 * * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 16, 18, 15, 30).unwrap();
        let next = next_fire(&schedule, now, chrono_tz::Asia::Seoul).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 16, 19, 0, 0).unwrap());
    }

    #[test]
    fn daily_fire_uses_local_zone() {
        let schedule = parse_schedule("0 6 * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 16, 12, 0, 0).unwrap();
        let next = next_fire(&schedule, now, chrono_tz::Asia::Seoul).unwrap();
        // 06:00 KST on the 17th is 21:00 UTC on the 16th.
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 16, 21, 0, 0).unwrap());
    }

    #[test]
    fn six_field_passes_through() {
        let schedule = parse_schedule("30 0 * * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 16, 18, 0, 0).unwrap();
        let next = next_fire(&schedule, now, chrono_tz::UTC).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 16, 18, 0, 30).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_schedule("every hour").is_err());
    }

    #[test]
    fn delay_is_never_negative() {
        let now = Utc.with_ymd_and_hms(2024, 3, 16, 18, 0, 0).unwrap();
        let later = now + chrono::Duration::seconds(90);
        assert_eq!(delay_until(later, now), Duration::from_secs(90));
        assert_eq!(delay_until(now, later), Duration::ZERO);
    }
}
