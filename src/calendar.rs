//! Calendar-slot indexing and midnight arithmetic
//!
//! The weekly histories are addressed two ways: user-facing writes go to the
//! slot matching today's day of week (Monday=0 .. Sunday=6), while the
//! scheduled daily reset shifts the whole array. The indexing half lives
//! here; the rotation lives in the engine.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::types::WEEK_SLOTS;

/// Short labels for the weekly histories, Monday first
pub const DAY_LABELS: [&str; WEEK_SLOTS] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Weekly-history slot for a calendar date: Monday=0 .. Sunday=6
pub fn day_slot(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

/// Slot representing the day before `date`
pub fn yesterday_slot(date: NaiveDate) -> usize {
    (day_slot(date) + WEEK_SLOTS - 1) % WEEK_SLOTS
}

/// Delay from `now` until the next local midnight.
///
/// Always computed from the current instant, never from a fixed 24h
/// interval, so clock changes and missed wake-ups self-correct on the next
/// arm.
pub fn until_next_midnight(now: NaiveDateTime) -> Duration {
    let next_midnight = (now.date() + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .unwrap_or(now);
    next_midnight - now
}

/// Day labels with today's entry replaced by "Today"
pub fn week_labels(today: NaiveDate) -> [String; WEEK_SLOTS] {
    let today_slot = day_slot(today);
    std::array::from_fn(|i| {
        if i == today_slot {
            "Today".to_string()
        } else {
            DAY_LABELS[i].to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_slot_monday_through_sunday() {
        // 2024-01-15 is a Monday
        for offset in 0..7 {
            let day = date(2024, 1, 15) + Duration::days(offset);
            assert_eq!(day_slot(day), offset as usize);
        }
    }

    #[test]
    fn test_day_slot_wednesday_is_two() {
        // 2024-01-17 is a Wednesday
        assert_eq!(day_slot(date(2024, 1, 17)), 2);
    }

    #[test]
    fn test_yesterday_slot_wraps_on_monday() {
        // Monday's yesterday is Sunday, slot 6
        assert_eq!(yesterday_slot(date(2024, 1, 15)), 6);
        assert_eq!(yesterday_slot(date(2024, 1, 17)), 1);
    }

    #[test]
    fn test_until_next_midnight() {
        let now = date(2024, 1, 15).and_hms_opt(23, 59, 0).unwrap();
        assert_eq!(until_next_midnight(now), Duration::minutes(1));

        let morning = date(2024, 1, 15).and_hms_opt(0, 0, 1).unwrap();
        assert_eq!(
            until_next_midnight(morning),
            Duration::hours(24) - Duration::seconds(1)
        );
    }

    #[test]
    fn test_until_next_midnight_at_exact_midnight() {
        // At 00:00:00 the next fire is a full day away, not zero
        let midnight = date(2024, 1, 15).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(until_next_midnight(midnight), Duration::hours(24));
    }

    #[test]
    fn test_week_labels_mark_today() {
        let labels = week_labels(date(2024, 1, 17));
        assert_eq!(labels[2], "Today");
        assert_eq!(labels[0], "Mon");
        assert_eq!(labels[6], "Sun");
    }
}
