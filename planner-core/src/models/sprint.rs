use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::error::PlanError;

/// A fixed-length iteration measured in working weeks.
///
/// `end_date` is always derived from `start_date` and `duration_weeks` via
/// [`calendar::end_date`], so it is always a business day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sprint {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub duration_weeks: u32,
    pub end_date: NaiveDate,
}

impl Sprint {
    /// Build a sprint from its input, deriving the end date.
    ///
    /// Rejects a zero-week duration and a start date that falls on a weekend.
    pub fn from_input(id: i64, input: NewSprint) -> Result<Self, PlanError> {
        if input.name.trim().is_empty() {
            return Err(PlanError::InvalidSprint("sprint name is required".into()));
        }
        if !calendar::is_business_day(input.start_date) {
            return Err(PlanError::InvalidSprint(format!(
                "sprint must start on a business day, {} is a {}",
                input.start_date,
                input.start_date.format("%A")
            )));
        }
        if input.duration_weeks == 0 {
            return Err(PlanError::InvalidSprint(
                "sprint duration must be at least one week".into(),
            ));
        }
        let end_date = calendar::end_date(input.start_date, input.duration_weeks).ok_or_else(
            || {
                PlanError::InvalidSprint(format!(
                    "a {}-week sprint ends past the supported date range",
                    input.duration_weeks
                ))
            },
        )?;

        Ok(Self {
            id,
            name: input.name,
            start_date: input.start_date,
            duration_weeks: input.duration_weeks,
            end_date,
        })
    }

    /// Number of business days between start and end, inclusive.
    pub fn business_day_count(&self) -> u32 {
        calendar::business_day_count(self.start_date, self.end_date)
    }

    /// Business-day columns of this sprint, in order.
    pub fn business_days(&self) -> Vec<NaiveDate> {
        calendar::business_days(self.start_date, self.end_date).collect()
    }

    /// Whether `[start, end]` intersects this sprint's period.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }
}

/// Input for creating or replacing a sprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSprint {
    pub name: String,
    pub start_date: NaiveDate,
    pub duration_weeks: u32,
}

/// Find the first sprint in `existing` whose period overlaps `candidate`,
/// ignoring the sprint with the candidate's own id.
pub fn find_overlap<'a>(existing: &'a [Sprint], candidate: &Sprint) -> Option<&'a Sprint> {
    existing
        .iter()
        .filter(|s| s.id != candidate.id)
        .find(|s| s.overlaps(candidate.start_date, candidate.end_date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input(start: NaiveDate, weeks: u32) -> NewSprint {
        NewSprint {
            name: "Sprint".to_string(),
            start_date: start,
            duration_weeks: weeks,
        }
    }

    #[test]
    fn test_end_date_is_derived() {
        let sprint = Sprint::from_input(1, input(date(2024, 1, 1), 2)).unwrap();
        assert_eq!(sprint.end_date, date(2024, 1, 12));
        assert_eq!(sprint.business_day_count(), 10);
    }

    #[test]
    fn test_zero_weeks_rejected() {
        let err = Sprint::from_input(1, input(date(2024, 1, 1), 0)).unwrap_err();
        assert!(matches!(err, PlanError::InvalidSprint(_)));
    }

    #[test]
    fn test_out_of_range_duration_rejected() {
        let err = Sprint::from_input(1, input(date(2024, 1, 1), u32::MAX)).unwrap_err();
        assert!(matches!(err, PlanError::InvalidSprint(_)));
        assert!(err.to_string().contains("supported date range"));
    }

    #[test]
    fn test_weekend_start_rejected() {
        let err = Sprint::from_input(1, input(date(2024, 1, 6), 1)).unwrap_err();
        assert!(err.to_string().contains("Saturday"));
    }

    #[test]
    fn test_overlap_ignores_self() {
        let a = Sprint::from_input(1, input(date(2024, 1, 1), 2)).unwrap();
        let b = Sprint::from_input(2, input(date(2024, 1, 15), 2)).unwrap();
        let moved = Sprint::from_input(1, input(date(2024, 1, 8), 1)).unwrap();

        let existing = vec![a.clone(), b.clone()];
        assert!(find_overlap(&existing, &moved).is_none());

        let clash = Sprint::from_input(3, input(date(2024, 1, 12), 1)).unwrap();
        assert_eq!(find_overlap(&existing, &clash).map(|s| s.id), Some(1));
    }
}
