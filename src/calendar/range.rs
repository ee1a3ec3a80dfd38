//! Calendar viewport → concrete time window.
//!
//! A viewport is an anchor date plus a view granularity. Windows are computed
//! on local calendar dates in the studio's timezone and returned as inclusive
//! UTC ranges with millisecond precision: the end of a unit is the start of the
//! next unit minus one millisecond.

use std::fmt;

use chrono::offset::LocalResult;
use chrono::{
    DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Inclusive `[start, end]` window in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }

    pub fn covers(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True when the two ranges share an instant or sit back to back at
    /// millisecond resolution.
    pub fn touches(&self, other: &TimeRange) -> bool {
        let tick = Duration::milliseconds(1);
        self.start <= other.end + tick && other.start <= self.end + tick
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarView {
    Day,
    Week,
    WorkWeek,
    Month,
    Agenda,
}

/// The window a calendar shows for `anchor` in `view`.
///
/// Agenda spans the anchor's day through the end of the day `agenda_days`
/// later. Weeks start on Monday; a work week resolves to the full week.
pub fn resolve(anchor: NaiveDate, view: CalendarView, tz: Tz, agenda_days: u32) -> TimeRange {
    let (first_day, next_day) = match view {
        CalendarView::Day => (anchor, anchor + Days::new(1)),
        CalendarView::Week | CalendarView::WorkWeek => {
            let monday = anchor - Days::new(anchor.weekday().num_days_from_monday() as u64);
            (monday, monday + Days::new(7))
        }
        CalendarView::Month => {
            let first = anchor.with_day(1).unwrap_or(anchor);
            let next = first.checked_add_months(Months::new(1)).unwrap_or(NaiveDate::MAX);
            (first, next)
        }
        CalendarView::Agenda => (anchor, anchor + Days::new(agenda_days as u64 + 1)),
    };

    let start = start_of_day(tz, first_day);
    let end = start_of_day(tz, next_day) - Duration::milliseconds(1);
    TimeRange { start, end }
}

pub fn start_of_day(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    local_to_utc(tz, date.and_time(NaiveTime::MIN))
}

/// Local wall time → UTC. Ambiguous times take the earlier instant; times in a
/// DST gap move forward to the first valid minute.
pub fn local_to_utc(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => (1..=180)
            .find_map(|m| {
                tz.from_local_datetime(&(naive + Duration::minutes(m)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::{America, Europe, UTC};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_day_in_utc() {
        let r = resolve(date("2024-01-01"), CalendarView::Day, UTC, 30);
        assert_eq!(r.start, utc("2024-01-01T00:00:00Z"));
        assert_eq!(r.end, utc("2024-01-01T23:59:59.999Z"));
    }

    #[test]
    fn test_week_starts_monday() {
        // 2024-01-04 is a Thursday.
        let r = resolve(date("2024-01-04"), CalendarView::Week, UTC, 30);
        assert_eq!(r.start, utc("2024-01-01T00:00:00Z"));
        assert_eq!(r.end, utc("2024-01-07T23:59:59.999Z"));
        assert_eq!(r, resolve(date("2024-01-04"), CalendarView::WorkWeek, UTC, 30));
    }

    #[test]
    fn test_month_in_madrid() {
        let r = resolve(date("2024-02-15"), CalendarView::Month, Europe::Madrid, 30);
        assert_eq!(r.start, utc("2024-01-31T23:00:00Z"));
        assert_eq!(r.end, utc("2024-02-29T22:59:59.999Z"));
    }

    #[test]
    fn test_agenda_length() {
        let r = resolve(date("2024-01-01"), CalendarView::Agenda, UTC, 30);
        assert_eq!(r.start, utc("2024-01-01T00:00:00Z"));
        assert_eq!(r.end, utc("2024-01-31T23:59:59.999Z"));

        let r = resolve(date("2024-01-01"), CalendarView::Agenda, UTC, 0);
        assert_eq!(r.end, utc("2024-01-01T23:59:59.999Z"));
    }

    #[test]
    fn test_dst_day_is_23_hours() {
        // Spring forward in Madrid.
        let r = resolve(date("2024-03-31"), CalendarView::Day, Europe::Madrid, 30);
        assert_eq!((r.end - r.start).num_milliseconds(), 23 * 3_600_000 - 1);
    }

    #[test]
    fn test_midnight_in_dst_gap_shifts_forward() {
        // Santiago skips 00:00-01:00 on 2024-09-08.
        let start = start_of_day(America::Santiago, date("2024-09-08"));
        assert_eq!(start, utc("2024-09-08T04:00:00Z"));
    }

    #[test]
    fn test_end_always_after_start() {
        let views = [
            CalendarView::Day,
            CalendarView::Week,
            CalendarView::WorkWeek,
            CalendarView::Month,
            CalendarView::Agenda,
        ];
        let zones = [UTC, Europe::Madrid, America::Santiago, America::New_York];
        let mut day = date("2023-12-25");
        for _ in 0..800 {
            for view in views {
                for tz in zones {
                    let r = resolve(day, view, tz, 30);
                    assert!(r.end > r.start, "{view:?} {tz} {day}: {r}");
                    assert!(r.contains(start_of_day(tz, day)));
                }
            }
            day = day + Days::new(1);
        }
    }

    #[test]
    fn test_touches() {
        let a = TimeRange::new(utc("2024-01-01T00:00:00Z"), utc("2024-01-01T23:59:59.999Z"));
        let b = TimeRange::new(utc("2024-01-02T00:00:00Z"), utc("2024-01-02T23:59:59.999Z"));
        let c = TimeRange::new(utc("2024-01-02T00:00:00.001Z"), utc("2024-01-03T00:00:00Z"));
        assert!(a.touches(&b));
        assert!(b.touches(&a));
        assert!(!a.touches(&c));
    }
}
