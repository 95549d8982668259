//! Study-time aggregation
//!
//! Combines the running timer with persisted sessions into daily totals and
//! groups sessions by date range, subject and method.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::timer::TimerSnapshot;

use super::StudySessionRecord;

/// Subject shown for sessions saved without one
const UNSPECIFIED_SUBJECT: &str = "unspecified";
/// Method shown for sessions saved without one
const UNKNOWN_METHOD: &str = "other";

/// Daily study-time totals in a given time zone
#[derive(Debug, Clone)]
pub struct DailyStudyTime<Tz: TimeZone = Local> {
    tz: Tz,
}

impl DailyStudyTime<Local> {
    /// Aggregator using the host's local time zone
    pub fn local() -> Self {
        Self { tz: Local }
    }
}

impl Default for DailyStudyTime<Local> {
    fn default() -> Self {
        Self::local()
    }
}

impl<Tz: TimeZone> DailyStudyTime<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Start of `date` in this time zone, as a UTC instant
    ///
    /// Usually local midnight. When a DST gap skips midnight, the day starts
    /// at the first local time that exists.
    pub fn midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let start = date.and_time(NaiveTime::MIN);
        (0i64..24 * 60)
            .step_by(15)
            .find_map(|minutes| {
                self.tz
                    .from_local_datetime(&(start + Duration::minutes(minutes)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&start))
    }

    /// Seconds studied on `date`: the timer's unsaved work plus saved sessions
    ///
    /// Saved sessions only count when recorded under `date` on or after its
    /// local midnight. The running timer is not split at midnight.
    pub fn total_for(
        &self,
        date: NaiveDate,
        snapshot: &TimerSnapshot,
        sessions: &[StudySessionRecord],
    ) -> u64 {
        let in_flight = snapshot.total_accumulated_secs + snapshot.in_flight_work_secs();

        let midnight = self.midnight(date);
        let saved: u64 = sessions
            .iter()
            .filter(|s| s.date == date && s.created_at >= midnight)
            .map(|s| s.duration_secs)
            .sum();

        in_flight + saved
    }

    /// [`Self::total_for`] formatted as `HH:MM:SS`
    pub fn formatted_total_for(
        &self,
        date: NaiveDate,
        snapshot: &TimerSnapshot,
        sessions: &[StudySessionRecord],
    ) -> String {
        format_long(self.total_for(date, snapshot, sessions))
    }
}

/// Total saved seconds for planner dates in `start..=end`
pub fn total_for_range(sessions: &[StudySessionRecord], start: NaiveDate, end: NaiveDate) -> u64 {
    sessions
        .iter()
        .filter(|s| s.date >= start && s.date <= end)
        .map(|s| s.duration_secs)
        .sum()
}

/// Saved seconds per subject
pub fn by_subject(sessions: &[StudySessionRecord]) -> BTreeMap<String, u64> {
    group_by(sessions, |s| non_empty_or(&s.subject, UNSPECIFIED_SUBJECT))
}

/// Saved seconds per timer method
pub fn by_method(sessions: &[StudySessionRecord]) -> BTreeMap<String, u64> {
    group_by(sessions, |s| non_empty_or(&s.method_id, UNKNOWN_METHOD))
}

fn group_by<F>(sessions: &[StudySessionRecord], key: F) -> BTreeMap<String, u64>
where
    F: Fn(&StudySessionRecord) -> String,
{
    let mut totals = BTreeMap::new();
    for session in sessions {
        *totals.entry(key(session)).or_insert(0) += session.duration_secs;
    }
    totals
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Format seconds as MM:SS (minutes are not capped at 59)
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Format seconds as HH:MM:SS
pub fn format_long(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::{day, noon, record};
    use crate::timer::{ActivePhase, Phase};
    use chrono::{FixedOffset, LocalResult, NaiveDateTime};

    /// UTC-5 until local 2026-03-02 00:00, then UTC-4; local 00:00-01:00 never happens
    #[derive(Debug, Clone, Copy)]
    struct GapAtMidnight;

    impl GapAtMidnight {
        fn before() -> FixedOffset {
            FixedOffset::west_opt(5 * 3600).unwrap()
        }

        fn after() -> FixedOffset {
            FixedOffset::west_opt(4 * 3600).unwrap()
        }

        fn gap_start() -> NaiveDateTime {
            day(2026, 3, 2).and_hms_opt(0, 0, 0).unwrap()
        }
    }

    impl TimeZone for GapAtMidnight {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            GapAtMidnight
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let gap_end = Self::gap_start() + Duration::hours(1);
            if *local < Self::gap_start() {
                LocalResult::Single(Self::before())
            } else if *local < gap_end {
                LocalResult::None
            } else {
                LocalResult::Single(Self::after())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            // Local gap start at UTC-5
            if *utc < Self::gap_start() + Duration::hours(5) {
                Self::before()
            } else {
                Self::after()
            }
        }
    }

    fn snapshot(phase: Phase, paused_from: ActivePhase, accumulated: u64, elapsed: u64) -> TimerSnapshot {
        TimerSnapshot {
            method_id: "pomodoro".to_string(),
            phase,
            paused_from,
            remaining_secs: 0,
            elapsed_in_phase: elapsed,
            total_accumulated_secs: accumulated,
            cycle_index: 1,
            remaining_questions: None,
        }
    }

    fn idle() -> TimerSnapshot {
        snapshot(Phase::Idle, ActivePhase::Working, 0, 0)
    }

    #[test]
    fn test_in_flight_work_counts() {
        let daily = DailyStudyTime::new(Utc);
        let date = day(2026, 3, 2);

        let working = snapshot(Phase::Working, ActivePhase::Working, 1500, 200);
        assert_eq!(daily.total_for(date, &working, &[]), 1700);

        let paused = snapshot(Phase::Paused, ActivePhase::Working, 1500, 200);
        assert_eq!(daily.total_for(date, &paused, &[]), 1700);

        let on_break = snapshot(Phase::Break, ActivePhase::Working, 1500, 200);
        assert_eq!(daily.total_for(date, &on_break, &[]), 1500);

        let paused_break = snapshot(Phase::Paused, ActivePhase::Break, 1500, 200);
        assert_eq!(daily.total_for(date, &paused_break, &[]), 1500);
    }

    #[test]
    fn test_saved_sessions_for_other_dates_are_ignored() {
        let daily = DailyStudyTime::new(Utc);
        let monday = day(2026, 3, 2);
        let tuesday = day(2026, 3, 3);
        let sessions = vec![
            record(monday, 600, noon(monday)),
            record(monday, 900, noon(monday)),
            record(tuesday, 1200, noon(tuesday)),
        ];

        assert_eq!(daily.total_for(monday, &idle(), &sessions), 1500);
        assert_eq!(daily.formatted_total_for(monday, &idle(), &sessions), "00:25:00");
    }

    #[test]
    fn test_midnight_boundary() {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let daily = DailyStudyTime::new(offset);
        let date = day(2026, 3, 2);
        let midnight = daily.midnight(date);
        assert_eq!(midnight, Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap());

        let before = vec![record(date, 600, midnight - Duration::seconds(1))];
        assert_eq!(daily.total_for(date, &idle(), &before), 0);

        let after = vec![record(date, 600, midnight + Duration::seconds(1))];
        assert_eq!(daily.total_for(date, &idle(), &after), 600);

        let exactly = vec![record(date, 600, midnight)];
        assert_eq!(daily.total_for(date, &idle(), &exactly), 600);
    }

    #[test]
    fn test_skipped_midnight_starts_at_first_local_time() {
        let daily = DailyStudyTime::new(GapAtMidnight);
        let date = day(2026, 3, 2);

        // Local 01:00 at UTC-4
        let start = daily.midnight(date);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 2, 5, 0, 0).unwrap());

        let sessions = vec![
            record(date, 100, start - Duration::seconds(1)),
            record(date, 200, start + Duration::seconds(1)),
        ];
        assert_eq!(daily.total_for(date, &idle(), &sessions), 200);

        // Days without a gap still start at midnight
        assert_eq!(
            daily.midnight(day(2026, 3, 1)),
            Utc.with_ymd_and_hms(2026, 3, 1, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_midnight_boundary_local_time_zone() {
        let daily = DailyStudyTime::local();
        let date = day(2026, 3, 2);
        let midnight = daily.midnight(date);

        let sessions = vec![
            record(date, 100, midnight - Duration::seconds(1)),
            record(date, 200, midnight + Duration::seconds(1)),
        ];
        assert_eq!(daily.total_for(date, &idle(), &sessions), 200);
    }

    #[test]
    fn test_total_for_range() {
        let sessions = vec![
            record(day(2026, 3, 1), 100, noon(day(2026, 3, 1))),
            record(day(2026, 3, 2), 200, noon(day(2026, 3, 2))),
            record(day(2026, 3, 5), 400, noon(day(2026, 3, 5))),
        ];
        assert_eq!(total_for_range(&sessions, day(2026, 3, 1), day(2026, 3, 2)), 300);
        assert_eq!(total_for_range(&sessions, day(2026, 3, 3), day(2026, 3, 4)), 0);
    }

    #[test]
    fn test_group_by_subject_and_method() {
        let date = day(2026, 3, 2);
        let mut english = record(date, 300, noon(date));
        english.subject = "English".to_string();
        english.method_id = "52-17".to_string();
        let mut blank = record(date, 50, noon(date));
        blank.subject = String::new();
        let sessions = vec![record(date, 600, noon(date)), english, blank];

        let subjects = by_subject(&sessions);
        assert_eq!(subjects["Math"], 600);
        assert_eq!(subjects["English"], 300);
        assert_eq!(subjects["unspecified"], 50);

        let methods = by_method(&sessions);
        assert_eq!(methods["pomodoro"], 650);
        assert_eq!(methods["52-17"], 300);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(5400), "90:00");
    }

    #[test]
    fn test_format_long() {
        assert_eq!(format_long(0), "00:00:00");
        assert_eq!(format_long(3665), "01:01:05");
        assert_eq!(format_long(36_000 + 59), "10:00:59");
    }
}
