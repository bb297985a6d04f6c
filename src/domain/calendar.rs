//! Working calendar
//!
//! The scheduling core counts lags and durations in working days. A
//! [`Calendar`] classifies days and shifts dates; [`WeekendCalendar`] is the
//! stock implementation with configurable weekend days and holidays.
//!
//! # Time Model
//! Dates are day boundaries. A task occupying `[start, end)` works on every
//! working day `d` with `start <= d < end`.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::{BTreeSet, HashSet};
use tracing::warn;

/// Upper bound on consecutive non-working days scanned, so a calendar
/// without working days cannot hang a shift.
const MAX_SCAN_DAYS: u64 = 3660;

/// Classification of a single day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayType {
    Working,
    NonWorking,
}

/// Direction used when looking for the closest working day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Forward,
    Backward,
}

/// Calendar service consumed by constraints and the scheduler
pub trait Calendar {
    /// Classifies the given day
    fn day_type(&self, date: NaiveDate) -> DayType;

    /// Returns true if the given day is a working day
    fn is_working_day(&self, date: NaiveDate) -> bool {
        self.day_type(date) == DayType::Working
    }

    /// Shifts `date` by `working_days` working days (negative moves backward)
    ///
    /// Moving forward, every working day passed counts; moving backward,
    /// every working day entered counts. With every day working this is plain
    /// date arithmetic.
    fn shift_date(&self, date: NaiveDate, working_days: i64) -> NaiveDate {
        let mut current = date;
        let mut remaining = working_days.unsigned_abs();
        // Consecutive non-working days stepped since the last working day
        let mut idle = 0u64;

        while remaining > 0 {
            if idle > MAX_SCAN_DAYS {
                warn!(%date, working_days, "no working days found, shifting by calendar days");
                return add_days(date, working_days);
            }

            let counted = if working_days > 0 {
                let working = self.is_working_day(current);
                current = add_days(current, 1);
                working
            } else {
                current = add_days(current, -1);
                self.is_working_day(current)
            };

            if counted {
                remaining -= 1;
                idle = 0;
            } else {
                idle += 1;
            }
        }

        current
    }

    /// Returns the closest working day at or after (forward) / at or before
    /// (backward) the given date
    fn find_closest_working_day(&self, date: NaiveDate, direction: MoveDirection) -> NaiveDate {
        let step = match direction {
            MoveDirection::Forward => 1,
            MoveDirection::Backward => -1,
        };

        let mut current = date;
        for _ in 0..MAX_SCAN_DAYS {
            if self.is_working_day(current) {
                return current;
            }
            current = add_days(current, step);
        }

        warn!(%date, ?direction, "no working day found");
        date
    }

    /// Counts working days in `[start, end)`; negative if `end < start`
    fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        let (from, to, sign) = if start <= end {
            (start, end, 1)
        } else {
            (end, start, -1)
        };

        let count = from
            .iter_days()
            .take_while(|day| *day < to)
            .filter(|day| self.is_working_day(*day))
            .count() as i64;

        sign * count
    }
}

/// Adds a signed number of calendar days, saturating at the chrono range
pub(crate) fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    };
    shifted.unwrap_or(date)
}

/// Calendar with weekly non-working days and individual holidays
#[derive(Debug, Clone)]
pub struct WeekendCalendar {
    weekends: HashSet<Weekday>,
    holidays: BTreeSet<NaiveDate>,
}

impl WeekendCalendar {
    /// Creates a calendar with Saturday and Sunday off
    pub fn new() -> Self {
        Self::with_weekends([Weekday::Sat, Weekday::Sun])
    }

    /// Creates a calendar where every day is a working day
    pub fn all_working() -> Self {
        Self::with_weekends([])
    }

    /// Creates a calendar with the given weekly non-working days
    pub fn with_weekends(weekends: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            weekends: weekends.into_iter().collect(),
            holidays: BTreeSet::new(),
        }
    }

    /// Adds a holiday
    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.holidays.insert(date);
        self
    }

    /// Adds a holiday in place
    pub fn add_holiday(&mut self, date: NaiveDate) -> bool {
        self.holidays.insert(date)
    }

    /// Returns true if the weekday is a weekly non-working day
    pub fn is_weekend(&self, weekday: Weekday) -> bool {
        self.weekends.contains(&weekday)
    }

    /// Iterates over holidays in date order
    pub fn holidays(&self) -> impl Iterator<Item = &NaiveDate> {
        self.holidays.iter()
    }
}

impl Default for WeekendCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl Calendar for WeekendCalendar {
    fn day_type(&self, date: NaiveDate) -> DayType {
        if self.weekends.contains(&date.weekday()) || self.holidays.contains(&date) {
            DayType::NonWorking
        } else {
            DayType::Working
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2024-01-05 is a Friday
    const FRI: (i32, u32, u32) = (2024, 1, 5);

    #[test]
    fn weekends_are_non_working() {
        let cal = WeekendCalendar::new();
        assert!(cal.is_working_day(date(FRI.0, FRI.1, FRI.2)));
        assert_eq!(cal.day_type(date(2024, 1, 6)), DayType::NonWorking);
        assert_eq!(cal.day_type(date(2024, 1, 7)), DayType::NonWorking);
        assert!(cal.is_working_day(date(2024, 1, 8)));
    }

    #[test]
    fn holidays_are_non_working() {
        let cal = WeekendCalendar::new().with_holiday(date(2024, 1, 8));
        assert!(!cal.is_working_day(date(2024, 1, 8)));
        assert_eq!(cal.holidays().count(), 1);
    }

    #[test]
    fn shift_on_all_working_calendar_is_plain_arithmetic() {
        let cal = WeekendCalendar::all_working();
        assert_eq!(cal.shift_date(date(2024, 1, 10), 2), date(2024, 1, 12));
        assert_eq!(cal.shift_date(date(2024, 1, 12), -2), date(2024, 1, 10));
        assert_eq!(cal.shift_date(date(2024, 1, 12), 0), date(2024, 1, 12));
    }

    #[test]
    fn shift_skips_weekends() {
        let cal = WeekendCalendar::new();
        // Thursday + 2 working days: Thu, Fri pass -> lands on Saturday boundary
        assert_eq!(cal.shift_date(date(2024, 1, 4), 2), date(2024, 1, 6));
        // Thursday + 3 working days: Thu, Fri, Mon -> Tuesday
        assert_eq!(cal.shift_date(date(2024, 1, 4), 3), date(2024, 1, 9));
        // Monday - 1 working day -> Friday
        assert_eq!(cal.shift_date(date(2024, 1, 8), -1), date(2024, 1, 5));
    }

    #[test]
    fn closest_working_day() {
        let cal = WeekendCalendar::new();
        let saturday = date(2024, 1, 6);
        assert_eq!(
            cal.find_closest_working_day(saturday, MoveDirection::Forward),
            date(2024, 1, 8)
        );
        assert_eq!(
            cal.find_closest_working_day(saturday, MoveDirection::Backward),
            date(2024, 1, 5)
        );
        assert_eq!(
            cal.find_closest_working_day(date(2024, 1, 8), MoveDirection::Forward),
            date(2024, 1, 8)
        );
    }

    #[test]
    fn working_days_between_counts_half_open_range() {
        let cal = WeekendCalendar::new();
        // Mon..next Mon contains five working days
        assert_eq!(cal.working_days_between(date(2024, 1, 1), date(2024, 1, 8)), 5);
        assert_eq!(cal.working_days_between(date(2024, 1, 8), date(2024, 1, 1)), -5);
        assert_eq!(cal.working_days_between(date(2024, 1, 6), date(2024, 1, 8)), 0);
    }

    #[test]
    fn long_shifts_keep_working_day_count() {
        let cal = WeekendCalendar::new().with_holiday(date(2025, 12, 25));
        let start = date(2024, 1, 1);

        let forward = cal.shift_date(start, 3000);
        assert_eq!(cal.working_days_between(start, forward), 3000);

        let backward = cal.shift_date(start, -3000);
        assert_eq!(cal.working_days_between(start, backward), -3000);
    }

    #[test]
    fn calendar_without_working_days_does_not_hang() {
        let cal = WeekendCalendar::with_weekends([
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]);
        assert_eq!(cal.shift_date(date(2024, 1, 1), 3), date(2024, 1, 4));
    }
}
