//! Calendar helpers for monthly schedules.

use time::{Date, Month};

use crate::Error;

/// Add `months` calendar months to `date`.
///
/// The day of the month is kept where possible and otherwise clamped to the last day of the
/// month, e.g. January 31st plus one month is February 28th (or 29th in a leap year).
///
/// # Errors
/// Returns [Error::Validation] if the result is outside of the supported date range.
pub fn add_months(date: Date, months: u32) -> Result<Date, Error> {
    let month_index = date.year() * 12 + i32::from(u8::from(date.month())) - 1 + months as i32;
    let year = month_index.div_euclid(12);
    let month = Month::try_from((month_index.rem_euclid(12) + 1) as u8)
        .map_err(|error| Error::Validation(error.to_string()))?;
    let day = date.day().min(month.length(year));

    Date::from_calendar_date(year, month, day).map_err(|error| Error::Validation(error.to_string()))
}

/// The first day of the month `date` falls in.
pub fn month_start(date: Date) -> Date {
    date.replace_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::{add_months, month_start};

    #[test]
    fn keeps_day_when_possible() {
        assert_eq!(add_months(date!(2025 - 01 - 15), 1), Ok(date!(2025 - 02 - 15)));
        assert_eq!(add_months(date!(2025 - 11 - 15), 3), Ok(date!(2026 - 02 - 15)));
    }

    #[test]
    fn clamps_to_month_end() {
        assert_eq!(add_months(date!(2025 - 01 - 31), 1), Ok(date!(2025 - 02 - 28)));
        assert_eq!(add_months(date!(2024 - 01 - 31), 1), Ok(date!(2024 - 02 - 29)));
        assert_eq!(add_months(date!(2025 - 01 - 31), 3), Ok(date!(2025 - 04 - 30)));
    }

    #[test]
    fn zero_months_is_same_date() {
        assert_eq!(add_months(date!(2025 - 06 - 30), 0), Ok(date!(2025 - 06 - 30)));
    }

    #[test]
    fn month_start_is_first_day() {
        assert_eq!(month_start(date!(2025 - 06 - 30)), date!(2025 - 06 - 01));
    }
}
