//! Month-grid math for the dashboard calendar widget.

use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_today: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    /// Empty cells before the 1st, with weeks starting on Sunday.
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

/// Build the grid for one month. `today` is passed in by the caller so the
/// highlight does not depend on ambient time.
pub fn month_grid(year: i32, month: u32, today: NaiveDate) -> Option<MonthGrid> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;

    let (next_year, next_month) = next_month(year, month);
    let days_in_month = NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()?
        .day();

    let days = (1..=days_in_month)
        .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .map(|date| CalendarDay {
            date,
            is_today: date == today,
        })
        .collect();

    Some(MonthGrid {
        year,
        month,
        leading_blanks: first.weekday().num_days_from_sunday(),
        days,
    })
}

pub fn events_on<'a>(events: &'a [CalendarEvent], date: NaiveDate) -> Vec<&'a CalendarEvent> {
    events.iter().filter(|event| event.date == date).collect()
}

/// The next `limit` events from `from` onward, soonest first.
pub fn upcoming_events<'a>(
    events: &'a [CalendarEvent],
    from: NaiveDate,
    limit: usize,
) -> Vec<&'a CalendarEvent> {
    let mut upcoming: Vec<&CalendarEvent> =
        events.iter().filter(|event| event.date >= from).collect();
    upcoming.sort_by_key(|event| event.date);
    upcoming.truncate(limit);
    upcoming
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

pub fn prev_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}
