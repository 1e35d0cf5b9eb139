//! Business-day calendar arithmetic.
//!
//! A business day is any Monday through Friday. There is no holiday table.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::models::DAYS_PER_WEEK;

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// All business days in `[start, end]`, ascending. Empty when `end < start`.
///
/// The iterator is `Clone`, so callers can walk the same range again.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> BusinessDays {
    BusinessDays {
        next: Some(start),
        end,
    }
}

#[derive(Debug, Clone)]
pub struct BusinessDays {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for BusinessDays {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        while let Some(current) = self.next {
            if current > self.end {
                self.next = None;
                break;
            }
            self.next = current.succ_opt();
            if is_business_day(current) {
                return Some(current);
            }
        }
        None
    }
}

pub fn business_day_count(start: NaiveDate, end: NaiveDate) -> u32 {
    business_days(start, end).count() as u32
}

/// Last day of a sprint of `weeks` working weeks starting on `start`.
///
/// Moves forward `weeks * 5 - 1` business days, so a Monday start lands on a
/// Friday. Returns `None` when `weeks` is zero or the result falls outside
/// the representable date range.
pub fn end_date(start: NaiveDate, weeks: u32) -> Option<NaiveDate> {
    if weeks == 0 {
        return None;
    }

    let mut steps = weeks.checked_mul(DAYS_PER_WEEK)? - 1;
    let mut current = start;

    // A weekend start reaches the following Monday in one step.
    while !is_business_day(current) && steps > 0 {
        current = current.checked_add_days(Days::new(1))?;
        if is_business_day(current) {
            steps -= 1;
        }
    }

    // From a business day, five business days are exactly one calendar week.
    let full_weeks = u64::from(steps / DAYS_PER_WEEK);
    current = current.checked_add_days(Days::new(full_weeks * 7))?;

    let mut taken = 0;
    while taken < steps % DAYS_PER_WEEK {
        current = current.checked_add_days(Days::new(1))?;
        if is_business_day(current) {
            taken += 1;
        }
    }
    Some(current)
}
