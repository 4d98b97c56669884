use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

/// One calendar row, Monday first. `None` marks days outside the month.
pub type Week = [Option<u64>; 7];

/// Month grid of pomodoro counts, Monday-first weeks.
///
/// Days of the month missing from `counts` show `Some(0)`. Returns `None`
/// for an invalid year/month.
pub fn month_grid(year: i32, month: u32, counts: &BTreeMap<u32, u64>) -> Option<Vec<Week>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let days = days_in_month(first)?;
    let lead = first.weekday().num_days_from_monday() as usize;

    let mut weeks = Vec::with_capacity(6);
    let mut week: Week = [None; 7];
    let mut column = lead;
    for day in 1..=days {
        week[column] = Some(counts.get(&day).copied().unwrap_or(0));
        column += 1;
        if column == 7 {
            weeks.push(week);
            week = [None; 7];
            column = 0;
        }
    }
    if column > 0 {
        weeks.push(week);
    }
    Some(weeks)
}

/// Number of days in the month starting at `first`.
pub fn days_in_month(first: NaiveDate) -> Option<u32> {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    u32::try_from((next - first).num_days()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn february_2021_fits_four_rows() {
        // 2021-02-01 is a Monday and the month has 28 days.
        let grid = month_grid(2021, 2, &BTreeMap::new()).unwrap();
        assert_eq!(grid.len(), 4);
        assert!(grid.iter().flatten().all(|c| *c == Some(0)));
    }

    #[test]
    fn leading_and_trailing_blanks() {
        // 2024-09-01 is a Sunday; September has 30 days.
        let counts = BTreeMap::from([(1, 2), (30, 5)]);
        let grid = month_grid(2024, 9, &counts).unwrap();
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[0][..6], [None; 6]);
        assert_eq!(grid[0][6], Some(2));
        assert_eq!(grid[1][0], Some(0));
        assert_eq!(grid[5][0], Some(5));
        assert_eq!(grid[5][1..], [None; 6]);
    }

    #[test]
    fn invalid_month() {
        assert!(month_grid(2024, 13, &BTreeMap::new()).is_none());
        assert!(month_grid(2024, 0, &BTreeMap::new()).is_none());
    }

    #[test]
    fn month_lengths() {
        let feb_leap = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let dec = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        assert_eq!(days_in_month(feb_leap), Some(29));
        assert_eq!(days_in_month(dec), Some(31));
    }
}
