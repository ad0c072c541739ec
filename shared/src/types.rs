//! Common types used across the platform

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive date range for queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, &'static str> {
        if end < start {
            return Err("End date must not be before start date");
        }
        Ok(Self { start, end })
    }

    /// From the first day of `today`'s month up to `today`
    pub fn month_to_date(today: NaiveDate) -> Self {
        let start = today.with_day(1).unwrap_or(today);
        Self { start, end: today }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = DateRange::new(d(2024, 5, 1), d(2024, 5, 31)).unwrap();
        assert!(range.contains(d(2024, 5, 1)));
        assert!(range.contains(d(2024, 5, 31)));
        assert!(!range.contains(d(2024, 6, 1)));
    }

    #[test]
    fn test_month_to_date() {
        let range = DateRange::month_to_date(d(2024, 2, 17));
        assert_eq!(range.start, d(2024, 2, 1));
        assert_eq!(range.end, d(2024, 2, 17));
    }

    #[test]
    fn test_reversed_range_rejected() {
        assert!(DateRange::new(d(2024, 5, 2), d(2024, 5, 1)).is_err());
    }
}
