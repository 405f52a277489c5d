//! Weekly index expiry calendar
//!
//! Index options expire weekly on Thursday; trading closes at 15:30 local
//! exchange time, after which the following week's contract is front month.
//! Exchange holidays are not modelled.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Weekday on which weekly contracts expire
pub const EXPIRY_WEEKDAY: Weekday = Weekday::Thu;

/// Market close on expiry day
pub fn market_close() -> NaiveTime {
    NaiveTime::from_hms_opt(15, 30, 0).unwrap_or(NaiveTime::MIN)
}

/// Front-month weekly expiry as of `now`
pub fn next_weekly_expiry(now: NaiveDateTime) -> NaiveDate {
    let today = now.date();
    let days_ahead = (EXPIRY_WEEKDAY.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);

    if days_ahead == 0 && now.time() >= market_close() {
        today + Duration::days(7)
    } else {
        today + Duration::days(days_ahead)
    }
}

/// The next `count` weekly expiries, nearest first
pub fn weekly_expiries(now: NaiveDateTime, count: usize) -> Vec<NaiveDate> {
    let first = next_weekly_expiry(now);
    (0..count as i64)
        .map(|week| first + Duration::weeks(week))
        .collect()
}

/// Calendar days from `today` to `expiry` (negative once expired)
pub fn days_to_expiry(expiry: NaiveDate, today: NaiveDate) -> i64 {
    (expiry - today).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_next_expiry_midweek() {
        // Monday 2025-01-13 -> Thursday 2025-01-16
        let expiry = next_weekly_expiry(at(2025, 1, 13, 10, 0));
        assert_eq!(expiry, NaiveDate::from_ymd_opt(2025, 1, 16).unwrap());
        assert_eq!(expiry.weekday(), Weekday::Thu);

        // Friday rolls to the following Thursday
        let expiry = next_weekly_expiry(at(2025, 1, 17, 10, 0));
        assert_eq!(expiry, NaiveDate::from_ymd_opt(2025, 1, 23).unwrap());
    }

    #[test]
    fn test_expiry_day_rolls_after_close() {
        let thursday = NaiveDate::from_ymd_opt(2025, 1, 16).unwrap();
        assert_eq!(next_weekly_expiry(at(2025, 1, 16, 15, 29)), thursday);
        assert_eq!(
            next_weekly_expiry(at(2025, 1, 16, 15, 30)),
            NaiveDate::from_ymd_opt(2025, 1, 23).unwrap()
        );
    }

    #[test]
    fn test_weekly_expiries() {
        let expiries = weekly_expiries(at(2025, 1, 13, 9, 15), 3);
        assert_eq!(expiries.len(), 3);
        assert_eq!(expiries[2], NaiveDate::from_ymd_opt(2025, 1, 30).unwrap());
    }

    #[test]
    fn test_days_to_expiry() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 13).unwrap();
        let expiry = NaiveDate::from_ymd_opt(2025, 1, 16).unwrap();
        assert_eq!(days_to_expiry(expiry, today), 3);
        assert_eq!(days_to_expiry(today, expiry), -3);
    }
}
