// External crates
use chrono::{Datelike, NaiveDate, Weekday};

/// Returns true for Monday through Friday
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Generates `periods` consecutive business days strictly after `last_date`.
///
/// Holidays are not modelled; only weekends are skipped.
pub fn next_business_days(last_date: NaiveDate, periods: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(periods);
    let mut current = last_date;
    while dates.len() < periods {
        current = match current.succ_opt() {
            Some(next) => next,
            None => break,
        };
        if is_business_day(current) {
            dates.push(current);
        }
    }
    dates
}
