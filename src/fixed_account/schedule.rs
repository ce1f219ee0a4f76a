//! When a recurring bill falls due.

use time::{Date, Duration};

use crate::{Error, dates::add_months};

text_enum! {
    /// How often a fixed account falls due.
    pub enum Frequency {
        Weekly => "weekly",
        Monthly => "monthly",
        Quarterly => "quarterly",
        Yearly => "yearly",
    }
}

impl Frequency {
    /// The number of months between occurrences, `None` for weekly.
    fn months(&self) -> Option<u32> {
        match self {
            Frequency::Weekly => None,
            Frequency::Monthly => Some(1),
            Frequency::Quarterly => Some(3),
            Frequency::Yearly => Some(12),
        }
    }
}

/// The `n`th occurrence after `start_date`, where the 0th is `start_date` itself.
///
/// Monthly frequencies keep the day of `start_date`, clamped to the end of shorter months, so a
/// bill starting on the 31st falls due on the 28th of February and the 31st of March again.
pub fn nth_occurrence(start_date: Date, frequency: Frequency, n: u32) -> Result<Date, Error> {
    match frequency.months() {
        Some(months) => add_months(start_date, months * n),
        None => start_date
            .checked_add(Duration::weeks(i64::from(n)))
            .ok_or_else(|| Error::Validation("date out of range".to_owned())),
    }
}

/// The first occurrence of a schedule starting at `start_date` that falls after `after`.
pub fn next_occurrence(start_date: Date, frequency: Frequency, after: Date) -> Result<Date, Error> {
    if after < start_date {
        return Ok(start_date);
    }

    // Jump close to `after` and then step forward.
    let mut n = match frequency.months() {
        Some(months) => {
            let elapsed = (after.year() - start_date.year()) * 12
                + i32::from(u8::from(after.month()))
                - i32::from(u8::from(start_date.month()));
            (elapsed.max(0) as u32) / months
        }
        None => ((after - start_date).whole_weeks().max(0)) as u32,
    };

    loop {
        let occurrence = nth_occurrence(start_date, frequency, n)?;
        if occurrence > after {
            return Ok(occurrence);
        }
        n += 1;
    }
}

/// The occurrences from `first` up to and including `until`.
pub fn occurrences_until(
    start_date: Date,
    frequency: Frequency,
    first: Date,
    until: Date,
) -> Result<Vec<Date>, Error> {
    let mut dates = Vec::new();
    let mut date = first;

    while date <= until {
        dates.push(date);
        date = next_occurrence(start_date, frequency, date)?;
    }

    Ok(dates)
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::{Frequency, next_occurrence, nth_occurrence, occurrences_until};

    #[test]
    fn weekly() {
        let start = date!(2025 - 01 - 06);

        assert_eq!(
            next_occurrence(start, Frequency::Weekly, start),
            Ok(date!(2025 - 01 - 13))
        );
        assert_eq!(
            next_occurrence(start, Frequency::Weekly, date!(2025 - 01 - 15)),
            Ok(date!(2025 - 01 - 20))
        );
    }

    #[test]
    fn monthly_keeps_original_day() {
        let start = date!(2025 - 01 - 31);

        let february = next_occurrence(start, Frequency::Monthly, start).unwrap();
        let march = next_occurrence(start, Frequency::Monthly, february).unwrap();

        assert_eq!(february, date!(2025 - 02 - 28));
        assert_eq!(march, date!(2025 - 03 - 31));
    }

    #[test]
    fn quarterly_and_yearly() {
        let start = date!(2024 - 02 - 29);

        assert_eq!(
            next_occurrence(start, Frequency::Quarterly, start),
            Ok(date!(2024 - 05 - 29))
        );
        assert_eq!(
            next_occurrence(start, Frequency::Yearly, start),
            Ok(date!(2025 - 02 - 28))
        );
        assert_eq!(
            nth_occurrence(start, Frequency::Yearly, 4),
            Ok(date!(2028 - 02 - 29))
        );
    }

    #[test]
    fn before_start_is_start() {
        let start = date!(2025 - 06 - 01);

        assert_eq!(
            next_occurrence(start, Frequency::Monthly, date!(2025 - 01 - 01)),
            Ok(start)
        );
    }

    #[test]
    fn lists_occurrences_in_window() {
        let start = date!(2025 - 01 - 10);

        let dates = occurrences_until(
            start,
            Frequency::Weekly,
            date!(2025 - 01 - 17),
            date!(2025 - 02 - 01),
        )
        .unwrap();

        assert_eq!(
            dates,
            vec![date!(2025 - 01 - 17), date!(2025 - 01 - 24), date!(2025 - 01 - 31)]
        );
    }
}
