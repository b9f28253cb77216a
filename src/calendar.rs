//! Date arithmetic behind the activity calendar.

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::AppError;
use crate::models::{DayCount, MonthSummary};

/// Half-open `[first day of month, first day of next month)`.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::Validation(format!("Invalid month {}-{}", year, month)))?;

    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| AppError::Validation(format!("Invalid month {}-{}", year, month)))?;

    Ok((start, end))
}

/// Consecutive active days ending today. A streak that ended yesterday
/// still counts, since today may not be logged yet.
///
/// `dates` must be distinct and sorted newest first.
pub fn current_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut expected = match dates.first() {
        Some(first) if *first == today => today,
        Some(first) if *first == today - Duration::days(1) => *first,
        _ => return 0,
    };

    let mut streak = 0;
    for date in dates {
        if *date != expected {
            break;
        }
        streak += 1;
        expected -= Duration::days(1);
    }
    streak
}

pub fn summarize_month(
    year: i32,
    month: u32,
    days: Vec<DayCount>,
    current_streak: u32,
) -> MonthSummary {
    MonthSummary {
        year,
        month,
        total: days.iter().map(|d| d.count).sum(),
        active_days: days.len(),
        days,
        current_streak,
    }
}

pub fn current_year_month(today: NaiveDate) -> (i32, u32) {
    (today.year(), today.month())
}
