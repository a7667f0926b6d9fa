//! Pure calendar arithmetic on civil dates.
//!
//! Every function here works on dates that are already expressed in a
//! household's zone (see [`crate::timezone::local_date`]); once a date is
//! civil, month lengths and weekdays no longer depend on the zone, so
//! nothing here takes one.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Number of days in `month` (1-12) of `year`, or 0 for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    if !(1..=12).contains(&month) {
        return 0;
    }
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(0)
}

/// The date `day` of the given month, with `day` capped to `[1, days_in_month]`.
pub fn clamp_day_of_month(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let last = days_in_month(year, month);
    if last == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day.clamp(1, last))
}

/// The `nth` occurrence of `weekday` in the given month.
///
/// `nth` is 1-based; `-1` selects the last occurrence. A request past the
/// end of the month (a "5th Monday" in a month with four) falls back to
/// the last occurrence that exists. Returns `None` for an invalid month
/// or an `nth` outside `1..=5` / `-1`.
pub fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, nth: i8) -> Option<NaiveDate> {
    match nth {
        -1 => {
            let last = clamp_day_of_month(year, month, 31)?;
            let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
            last.checked_sub_days(Days::new(u64::from(back)))
        }
        1..=5 => {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            let forward = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
            let weeks = u64::from(nth.unsigned_abs() - 1) * 7;
            let mut candidate = first.checked_add_days(Days::new(u64::from(forward) + weeks))?;
            while candidate.month() != month {
                candidate = candidate.checked_sub_days(Days::new(7))?;
            }
            Some(candidate)
        }
        _ => None,
    }
}

/// Converts an ISO weekday number (1 = Monday .. 7 = Sunday).
pub fn weekday_from_iso(number: u8) -> Option<Weekday> {
    match number {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(2024, 1, 31)]
    #[case(2024, 2, 29)]
    #[case(2023, 2, 28)]
    #[case(1900, 2, 28)]
    #[case(2000, 2, 29)]
    #[case(2024, 4, 30)]
    #[case(2024, 12, 31)]
    fn test_days_in_month(#[case] year: i32, #[case] month: u32, #[case] expected: u32) {
        assert_eq!(days_in_month(year, month), expected);
    }

    #[test]
    fn test_days_in_invalid_month() {
        assert_eq!(days_in_month(2024, 0), 0);
        assert_eq!(days_in_month(2024, 13), 0);
    }

    #[rstest]
    #[case(2024, 2, 31, date(2024, 2, 29))]
    #[case(2023, 2, 31, date(2023, 2, 28))]
    #[case(2024, 4, 31, date(2024, 4, 30))]
    #[case(2024, 5, 15, date(2024, 5, 15))]
    #[case(2024, 5, 0, date(2024, 5, 1))]
    fn test_clamp_day_of_month(#[case] year: i32, #[case] month: u32, #[case] day: u32, #[case] expected: NaiveDate) {
        assert_eq!(clamp_day_of_month(year, month, day), Some(expected));
    }

    #[test]
    fn test_clamp_day_of_invalid_month() {
        assert_eq!(clamp_day_of_month(2024, 13, 1), None);
    }

    #[rstest]
    #[case(2024, 2, Weekday::Mon, -1, date(2024, 2, 26))]
    #[case(2024, 2, Weekday::Thu, -1, date(2024, 2, 29))]
    #[case(2024, 3, Weekday::Fri, 1, date(2024, 3, 1))]
    #[case(2024, 3, Weekday::Mon, 1, date(2024, 3, 4))]
    #[case(2024, 3, Weekday::Mon, 2, date(2024, 3, 11))]
    #[case(2024, 3, Weekday::Sun, 4, date(2024, 3, 24))]
    #[case(2024, 3, Weekday::Sun, -1, date(2024, 3, 31))]
    // February 2023 has four Mondays; a fifth is capped to the fourth.
    #[case(2023, 2, Weekday::Mon, 5, date(2023, 2, 27))]
    #[case(2024, 12, Weekday::Tue, -1, date(2024, 12, 31))]
    fn test_nth_weekday_of_month(
        #[case] year: i32,
        #[case] month: u32,
        #[case] weekday: Weekday,
        #[case] nth: i8,
        #[case] expected: NaiveDate,
    ) {
        assert_eq!(nth_weekday_of_month(year, month, weekday, nth), Some(expected));
    }

    #[test]
    fn test_nth_weekday_rejects_invalid_input() {
        assert_eq!(nth_weekday_of_month(2024, 3, Weekday::Mon, 0), None);
        assert_eq!(nth_weekday_of_month(2024, 3, Weekday::Mon, -2), None);
        assert_eq!(nth_weekday_of_month(2024, 13, Weekday::Mon, 1), None);
    }

    #[test]
    fn test_zone_only_matters_when_choosing_the_civil_date() {
        use crate::timezone::{local_date, parse_timezone};
        use chrono::{TimeZone, Utc};

        // Jan 31, 23:30 UTC is already February in Zurich
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap();
        let zurich = local_date(parse_timezone("Europe/Zurich").unwrap(), at);
        let new_york = local_date(parse_timezone("America/New_York").unwrap(), at);

        assert_eq!(clamp_day_of_month(zurich.year(), zurich.month(), 31), Some(date(2024, 2, 29)));
        assert_eq!(clamp_day_of_month(new_york.year(), new_york.month(), 31), Some(date(2024, 1, 31)));
        assert_eq!(
            nth_weekday_of_month(zurich.year(), zurich.month(), Weekday::Thu, -1),
            Some(date(2024, 2, 29))
        );
    }

    #[test]
    fn test_weekday_from_iso() {
        assert_eq!(weekday_from_iso(1), Some(Weekday::Mon));
        assert_eq!(weekday_from_iso(7), Some(Weekday::Sun));
        assert_eq!(weekday_from_iso(0), None);
        assert_eq!(weekday_from_iso(8), None);
    }
}
