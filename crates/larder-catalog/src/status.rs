//! Open/closed status computation.
//!
//! Status is a pure function of `(record, now)` — no transition table, no
//! retained state. Callers refresh all records once per minute and after
//! every dataset (re)load; filter changes never trigger a recompute because
//! the refresh always precedes filtering.

use chrono::{Datelike, Days, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::record::{LocationRecord, Status};

/// A location opening within this many minutes reports `opening-soon`.
pub const OPENING_SOON_WINDOW_MINS: i64 = 120;

/// Computed status plus the accompanying message: an "Opens in Xh Ym"
/// countdown for `opening-soon`, the next-opening lookup for `closed`,
/// nothing for `open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub status: Status,
    pub next_opening: Option<String>,
}

/// Compute the status of one record at the given local time.
#[must_use]
pub fn compute_status(record: &LocationRecord, now: NaiveDateTime) -> StatusInfo {
    let (Some(open), Some(close)) = (record.opening_time, record.closing_time) else {
        return closed(record, now);
    };
    if !record.open_on(now.weekday()) {
        return closed(record, now);
    }

    let now_mins = minutes_since_midnight(now.time());
    let open_mins = minutes_since_midnight(open);
    let close_mins = minutes_since_midnight(close);

    // Open interval is half-open: closing minute counts as closed.
    if now_mins >= open_mins && now_mins < close_mins {
        return StatusInfo {
            status: Status::Open,
            next_opening: None,
        };
    }

    let until_open = open_mins - now_mins;
    if until_open > 0 && until_open <= OPENING_SOON_WINDOW_MINS {
        return StatusInfo {
            status: Status::OpeningSoon,
            next_opening: Some(format_time_until(until_open)),
        };
    }

    closed(record, now)
}

fn closed(record: &LocationRecord, now: NaiveDateTime) -> StatusInfo {
    StatusInfo {
        status: Status::Closed,
        next_opening: Some(find_next_opening(record, now)),
    }
}

/// Find the next qualifying opening within the coming week.
///
/// Day offset 0 only qualifies if today's opening time has not yet passed.
/// Returns `"Today at HH:MM"`, `"<Weekday> at HH:MM"`, or the literal
/// fallback `"Check opening times"` when no day in the window qualifies.
#[must_use]
pub fn find_next_opening(record: &LocationRecord, now: NaiveDateTime) -> String {
    let Some(open) = record.opening_time else {
        return "Check opening times".to_string();
    };

    for offset in 0..7u64 {
        let Some(date) = now.date().checked_add_days(Days::new(offset)) else {
            break;
        };
        if !record.open_on(date.weekday()) {
            continue;
        }
        if offset == 0 {
            if now.time() < open {
                return format!("Today at {}", open.format("%H:%M"));
            }
        } else {
            return format!("{} at {}", weekday_name(date.weekday()), open.format("%H:%M"));
        }
    }

    "Check opening times".to_string()
}

/// Recompute status and next-opening for every record in place.
pub fn refresh_statuses(records: &mut [LocationRecord], now: NaiveDateTime) {
    for record in records.iter_mut() {
        let info = compute_status(record, now);
        record.status = info.status;
        record.next_opening = info.next_opening;
    }
}

/// Number of records currently open.
#[must_use]
pub fn open_now_count(records: &[LocationRecord]) -> usize {
    records.iter().filter(|r| r.status == Status::Open).count()
}

fn minutes_since_midnight(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

fn format_time_until(minutes: i64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("Opens in {hours}h {mins}m")
    } else {
        format!("Opens in {mins}m")
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
