// src/calendar.rs
use crate::errors::MarkupError;
use chrono::{Datelike, Months, NaiveDate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMonth {
    pub name: String,
    pub days: Vec<NaiveDate>,
    /// Weekday of the 1st, counted from Sunday = 0.
    pub start_day: u32,
}

/// Months from `offset` months away up to the given month (negative offset), or from the
/// given month up to `offset` months ahead (positive offset).
pub fn months_around(year: i32, month: u32, offset: i32) -> Result<Vec<CalendarMonth>, MarkupError> {
    let anchor = NaiveDate::from_ymd_opt(year, month, 1).ok_or(MarkupError::InvalidMonth { year, month })?;
    let (start, end) = if offset < 0 { (offset, 0) } else { (0, offset) };

    (start..=end)
        .map(|shift| {
            let first = shift_months(anchor, shift).ok_or(MarkupError::InvalidMonth { year, month })?;
            Ok(month_of(first))
        })
        .collect()
}

fn shift_months(date: NaiveDate, shift: i32) -> Option<NaiveDate> {
    let months = Months::new(shift.unsigned_abs());
    if shift < 0 { date.checked_sub_months(months) } else { date.checked_add_months(months) }
}

fn month_of(first: NaiveDate) -> CalendarMonth {
    let days: Vec<NaiveDate> = first.iter_days().take_while(|d| d.month() == first.month()).collect();
    CalendarMonth {
        name: first.format("%B").to_string(),
        days,
        start_day: first.weekday().num_days_from_sunday(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_months_back_spans_three_months() {
        let months = months_around(2020, 3, -2).unwrap();

        let names: Vec<&str> = months.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["January", "February", "March"]);
        assert_eq!(months[1].days.len(), 29);
        // 1 Jan 2020 was a Wednesday
        assert_eq!(months[0].start_day, 3);
    }

    #[test]
    fn crosses_year_boundary() {
        let months = months_around(2021, 1, -1).unwrap();
        assert_eq!(months[0].days[0], NaiveDate::from_ymd_opt(2020, 12, 1).unwrap());
        assert_eq!(months[1].days.len(), 31);
    }

    #[test]
    fn rejects_invalid_month() {
        assert!(matches!(months_around(2020, 13, 0), Err(MarkupError::InvalidMonth { .. })));
    }
}
