use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Consecutive days with at least one finished pomodoro.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streak {
    /// Run ending today. Zero when today has no pomodoro yet.
    pub current: u32,
    pub longest: u32,
}

/// Compute the streak from distinct active dates sorted newest first.
pub fn productivity_streak(dates_desc: &[NaiveDate], today: NaiveDate) -> Streak {
    let current = dates_desc
        .iter()
        .zip(0..)
        .take_while(|&(date, offset)| *date == today - Duration::days(offset))
        .count();

    let mut longest = 0usize;
    let mut run = 0usize;
    let mut previous: Option<NaiveDate> = None;
    for &date in dates_desc {
        run = match previous {
            Some(prev) if prev - date == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }

    Streak {
        current: u32::try_from(current).unwrap_or(u32::MAX),
        longest: u32::try_from(longest).unwrap_or(u32::MAX),
    }
}
