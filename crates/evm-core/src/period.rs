use chrono::{Datelike, Months, NaiveDate};

use crate::error::EvmError;
use crate::EvmResult;

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the following month.
pub fn next_month(date: NaiveDate) -> EvmResult<NaiveDate> {
    month_start(date)
        .checked_add_months(Months::new(1))
        .ok_or_else(|| EvmError::DateError(format!("no month after {date}")))
}

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> EvmResult<NaiveDate> {
    next_month(date)?
        .pred_opt()
        .ok_or_else(|| EvmError::DateError(format!("no month end for {date}")))
}

/// Build a date from year / month / day, reporting invalid combinations.
pub fn ymd(year: i32, month: u32, day: u32) -> EvmResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| EvmError::DateError(format!("invalid date {year}-{month:02}-{day:02}")))
}

/// Every month start from `first` to `last` inclusive. Empty when
/// `last` precedes `first`.
pub fn month_range(first: NaiveDate, last: NaiveDate) -> EvmResult<Vec<NaiveDate>> {
    let mut months = Vec::new();
    let mut current = month_start(first);
    let end = month_start(last);
    while current <= end {
        months.push(current);
        current = next_month(current)?;
    }
    Ok(months)
}

/// "March 2024"
pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_month_end_handles_leap_february() {
        assert_eq!(month_end(d(2024, 2, 10)).unwrap(), d(2024, 2, 29));
        assert_eq!(month_end(d(2023, 2, 10)).unwrap(), d(2023, 2, 28));
    }

    #[test]
    fn test_next_month_rolls_over_december() {
        assert_eq!(next_month(d(2024, 12, 31)).unwrap(), d(2025, 1, 1));
    }

    #[test]
    fn test_month_range_inclusive() {
        let months = month_range(d(2024, 11, 20), d(2025, 2, 3)).unwrap();
        assert_eq!(
            months,
            vec![d(2024, 11, 1), d(2024, 12, 1), d(2025, 1, 1), d(2025, 2, 1)]
        );
        assert!(month_range(d(2025, 3, 1), d(2025, 1, 1)).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_ymd_is_an_error() {
        assert!(ymd(2024, 2, 30).is_err());
        assert_eq!(month_label(d(2024, 3, 5)), "March 2024");
    }
}
