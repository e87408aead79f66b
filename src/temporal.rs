// ⏰ Temporal Model - calendar months and the simulation horizon
//
// The engine only ever reasons in whole calendar months:
// - a Month is always stored as its first day
// - a Horizon is an inclusive range of months, walked in chronological order
// - validity windows are half-open: [start, end)

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SimError, SimResult};

// ============================================================================
// MONTH
// ============================================================================

/// A calendar month, serialized as its first-of-month date ("2019-01-01").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month(NaiveDate);

impl Month {
    /// Month containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Month(date.with_day(1).unwrap_or(date))
    }

    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Month)
    }

    /// Parse "YYYY-MM-DD" (any day, truncated to its month) or "YYYY-MM"
    pub fn parse(s: &str) -> SimResult<Self> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Month::from_date(date));
        }
        NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
            .map(Month)
            .map_err(|_| SimError::input(format!("invalid date: {:?}", s)))
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Calendar month number, 1-12
    pub fn number(&self) -> u32 {
        self.0.month()
    }

    /// Months elapsed since `earlier` (negative if `earlier` is later)
    pub fn months_since(&self, earlier: Month) -> i64 {
        (self.year() as i64 - earlier.year() as i64) * 12
            + (self.number() as i64 - earlier.number() as i64)
    }

    pub fn next(&self) -> Option<Month> {
        self.0.checked_add_months(Months::new(1)).map(Month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl TryFrom<String> for Month {
    type Error = SimError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Month::parse(&value)
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.to_string()
    }
}

// ============================================================================
// HORIZON
// ============================================================================

/// Inclusive range of months covered by one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    start: Month,
    end: Month,
}

impl Horizon {
    pub fn new(start: Month, end: Month) -> SimResult<Self> {
        if start > end {
            return Err(SimError::InvalidConfig(format!(
                "horizon start {} is after end {}",
                start, end
            )));
        }
        Ok(Horizon { start, end })
    }

    /// Horizon spanning the months of two dates (both ends inclusive)
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> SimResult<Self> {
        Horizon::new(Month::from_date(start), Month::from_date(end))
    }

    pub fn start(&self) -> Month {
        self.start
    }

    pub fn end(&self) -> Month {
        self.end
    }

    /// Number of months, both ends included
    pub fn len(&self) -> usize {
        (self.end.months_since(self.start) + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Horizon length in years (fractional)
    pub fn years(&self) -> f64 {
        self.len() as f64 / 12.0
    }

    pub fn contains(&self, month: Month) -> bool {
        self.start <= month && month <= self.end
    }

    /// All months in chronological order
    pub fn months(&self) -> Vec<Month> {
        let mut months = Vec::with_capacity(self.len());
        let mut current = Some(self.start);
        while let Some(month) = current {
            if month > self.end {
                break;
            }
            months.push(month);
            current = month.next();
        }
        months
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn m(y: i32, mo: u32) -> Month {
        Month::new(y, mo).unwrap()
    }

    #[test]
    fn test_month_parse_truncates_day() {
        let month = Month::parse("2019-03-17").unwrap();
        assert_eq!(month, m(2019, 3));
        assert_eq!(month.to_string(), "2019-03-01");
    }

    #[test]
    fn test_month_parse_year_month_form() {
        assert_eq!(Month::parse("2024-12").unwrap(), m(2024, 12));
    }

    #[test]
    fn test_month_parse_rejects_garbage() {
        assert!(Month::parse("12/31/2024").is_err());
        assert!(Month::parse("").is_err());
    }

    #[test]
    fn test_months_since_crosses_years() {
        assert_eq!(m(2021, 2).months_since(m(2019, 1)), 25);
        assert_eq!(m(2019, 1).months_since(m(2019, 1)), 0);
        assert_eq!(m(2019, 1).months_since(m(2019, 4)), -3);
    }

    #[test]
    fn test_horizon_six_years() {
        let horizon = Horizon::from_dates(
            NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
        .unwrap();

        let months = horizon.months();
        assert_eq!(months.len(), 72);
        assert_eq!(horizon.len(), 72);
        assert_eq!(months[0], m(2019, 1));
        assert_eq!(months[71], m(2024, 12));
        assert!((horizon.years() - 6.0).abs() < 1e-12);
        assert!(months.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_horizon_single_month() {
        let horizon = Horizon::new(m(2020, 5), m(2020, 5)).unwrap();
        assert_eq!(horizon.months(), vec![m(2020, 5)]);
    }

    #[test]
    fn test_horizon_rejects_reversed_range() {
        assert!(Horizon::new(m(2020, 5), m(2020, 4)).is_err());
    }

    #[test]
    fn test_month_serde_roundtrip_through_string() {
        let json = serde_json::to_string(&m(2022, 7)).unwrap();
        assert_eq!(json, "\"2022-07-01\"");
        let back: Month = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m(2022, 7));
    }
}
