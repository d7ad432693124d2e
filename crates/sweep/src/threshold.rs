//! Threshold classification of the time remaining before a deadline.
//!
//! Windows, with `d = deadline - now`:
//!
//! | window      | range              |
//! |-------------|--------------------|
//! | `3hours`    | `2h < d <= 3h`     |
//! | `1hour`     | `0 < d <= 1h`      |
//! | `passed`    | `-1h <= d < 0`     |
//!
//! Anything else, including `d == 0`, matches no window.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use duewatch_core::Threshold;

pub fn classify<Tz1: TimeZone, Tz2: TimeZone>(
    deadline: &DateTime<Tz1>,
    now: &DateTime<Tz2>,
) -> Option<Threshold> {
    let delta = deadline.with_timezone(&Utc) - now.with_timezone(&Utc);
    classify_delta(delta)
}

/// Classify a signed time-to-deadline.
pub fn classify_delta(delta: TimeDelta) -> Option<Threshold> {
    let zero = TimeDelta::zero();
    let one = TimeDelta::hours(1);

    if delta > TimeDelta::hours(2) && delta <= TimeDelta::hours(3) {
        Some(Threshold::ThreeHours)
    } else if delta > zero && delta <= one {
        Some(Threshold::OneHour)
    } else if delta >= -one && delta < zero {
        Some(Threshold::Passed)
    } else {
        None
    }
}

/// Signed fractional hours until the deadline.
pub fn hours_until<Tz1: TimeZone, Tz2: TimeZone>(
    deadline: &DateTime<Tz1>,
    now: &DateTime<Tz2>,
) -> f64 {
    let delta = deadline.with_timezone(&Utc) - now.with_timezone(&Utc);
    delta.num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hours: f64) -> Option<Threshold> {
        classify_delta(TimeDelta::milliseconds((hours * 3_600_000.0).round() as i64))
    }

    #[test]
    fn three_hour_window() {
        assert_eq!(at(3.0), Some(Threshold::ThreeHours));
        assert_eq!(at(2.75), Some(Threshold::ThreeHours));
        assert_eq!(at(3.01), None);
        assert_eq!(at(2.0), None);
    }

    #[test]
    fn one_hour_window() {
        assert_eq!(at(1.0), Some(Threshold::OneHour));
        assert_eq!(at(0.5), Some(Threshold::OneHour));
        assert_eq!(at(1.5), None);
    }

    #[test]
    fn passed_window() {
        assert_eq!(at(-1.0), Some(Threshold::Passed));
        assert_eq!(at(-0.75), Some(Threshold::Passed));
        assert_eq!(at(-1.01), None);
        assert_eq!(at(-1.5), None);
    }

    #[test]
    fn exact_deadline_matches_nothing() {
        assert_eq!(classify_delta(TimeDelta::zero()), None);
        assert_eq!(classify_delta(TimeDelta::milliseconds(1)), Some(Threshold::OneHour));
        assert_eq!(classify_delta(TimeDelta::milliseconds(-1)), Some(Threshold::Passed));
    }

    #[test]
    fn one_millisecond_past_the_bounds() {
        let ms = TimeDelta::milliseconds(1);
        assert_eq!(classify_delta(TimeDelta::hours(3) + ms), None);
        assert_eq!(classify_delta(TimeDelta::hours(2) + ms), Some(Threshold::ThreeHours));
        assert_eq!(classify_delta(TimeDelta::hours(1) + ms), None);
        assert_eq!(classify_delta(-TimeDelta::hours(1) - ms), None);
    }

    #[test]
    fn far_from_deadline() {
        assert_eq!(at(48.0), None);
        assert_eq!(at(-48.0), None);
    }

    #[test]
    fn mixed_time_zones() {
        let seoul = chrono_tz::Asia::Seoul;
        let deadline = seoul.with_ymd_and_hms(2024, 3, 17, 6, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 16, 18, 15, 0).unwrap(); // 03:15 KST
        assert_eq!(classify(&deadline, &now), Some(Threshold::ThreeHours));
        assert!((hours_until(&deadline, &now) - 2.75).abs() < 1e-9);
    }
}
