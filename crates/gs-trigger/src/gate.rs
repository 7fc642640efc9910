// gate.rs - The last-day-of-month gate.
//
// The scheduled trigger fires every day; this predicate decides whether
// today is the day to actually run. It is re-evaluated on every call, so
// firing twice on the last day runs twice.

use chrono::{Datelike, NaiveDate};

/// The final calendar day of `date`'s month.
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .unwrap_or(date)
}

/// True only when `today` is the last day of its month.
pub fn should_run_today(today: NaiveDate) -> bool {
    today == last_day_of_month(today)
}
