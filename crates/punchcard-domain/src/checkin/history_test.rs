use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};

use super::history::CheckinHistory;
use super::record::{CheckinRecord, CheckinReport, Outcome};

// Timestamps are built from the local wall clock because that is the
// calendar day keys are derived from; the stored instant is still Utc.
fn at(day: u32, hour: u32) -> chrono::DateTime<Utc> {
    Local
        .with_ymd_and_hms(2025, 6, day, hour, 0, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
}

fn success_record(day: u32, hour: u32) -> CheckinRecord {
    let report = CheckinReport::new(Outcome::Success, "got reward").with_numbers(
        Some(5.0),
        Some(105.0),
        Some(12),
    );
    CheckinRecord::from_report(&report, at(day, hour))
}

#[test]
fn same_day_failures_collapse_into_one_record() {
    let mut history = CheckinHistory::new();
    history.append(CheckinRecord::failure("timeout", at(1, 8)));
    history.append(CheckinRecord::failure("no csrf token", at(1, 10)));
    history.append(CheckinRecord::failure("timeout", at(1, 12)));

    assert_eq!(history.len(), 1);
    let record = &history.records()[0];
    assert_eq!(record.failure_count, 3);
    assert_eq!(record.message, "timeout");
    assert_eq!(record.timestamp, at(1, 12));
}

#[test]
fn success_replaces_failure_and_keeps_the_count() {
    let mut history = CheckinHistory::new();
    history.append(CheckinRecord::failure("timeout", at(1, 8)));
    history.append(CheckinRecord::failure("timeout", at(1, 10)));
    history.append(success_record(1, 12));

    assert_eq!(history.len(), 1);
    let record = &history.records()[0];
    assert_eq!(record.outcome, Outcome::Success);
    assert_eq!(record.failure_count, 2);
    assert_eq!(record.reward, Some(5.0));
}

#[test]
fn terminal_over_terminal_appends_a_second_entry() {
    let mut history = CheckinHistory::new();
    history.append(success_record(1, 8));

    let report = CheckinReport::new(Outcome::AlreadyDone, "already done today");
    history.append(CheckinRecord::from_report(&report, at(1, 20)));

    assert_eq!(history.len(), 2);
    // Newest first.
    assert_eq!(history.records()[0].outcome, Outcome::AlreadyDone);
    assert_eq!(history.records()[1].outcome, Outcome::Success);
}

#[test]
fn failure_after_success_starts_a_fresh_entry() {
    let mut history = CheckinHistory::new();
    history.append(success_record(1, 8));
    history.append(CheckinRecord::failure("timeout", at(2, 8)));

    assert_eq!(history.len(), 2);
    assert_eq!(history.records()[0].outcome, Outcome::Failed);
    assert_eq!(history.records()[0].failure_count, 1);
}

#[test]
fn day_is_done_only_for_terminal_records() {
    let mut history = CheckinHistory::new();
    history.append(CheckinRecord::failure("timeout", at(1, 8)));
    assert!(!history.day_is_done(day(1)));

    history.append(success_record(1, 12));
    assert!(history.day_is_done(day(1)));
    assert!(!history.day_is_done(day(2)));
}

#[test]
fn prune_drops_only_records_outside_the_window() {
    let mut history = CheckinHistory::new();
    history.append(success_record(1, 8));
    history.append(success_record(10, 8));
    history.append(success_record(20, 8));

    let now = at(20, 12);
    history.prune(15, now);

    assert_eq!(history.len(), 2);
    assert!(history
        .records()
        .iter()
        .all(|r| r.timestamp >= now - Duration::days(15)));
}

#[test]
fn day_key_follows_the_local_calendar() {
    // 23:00 local is already tomorrow in UTC west of Greenwich; the day
    // key must stay on the local date either way, or a late check-in
    // would not mark the local day done.
    let record = CheckinRecord::failure("timeout", at(1, 23));
    assert_eq!(record.day(), day(1));

    let mut history = CheckinHistory::new();
    history.append(record);
    assert!(!history.day_is_done(day(1)));

    let report = CheckinReport::new(Outcome::Success, "done");
    history.append(CheckinRecord::from_report(&report, at(1, 23)));
    assert!(history.day_is_done(day(1)));
    assert!(!history.day_is_done(day(2)));
}

#[test]
fn scenario_two_failures_then_success() {
    // max_attempts=2 walk-through from the retry design: the day's record
    // accumulates two failures, then flips to Success carrying the count.
    let mut history = CheckinHistory::new();

    history.append(CheckinRecord::failure("network error", at(5, 8)));
    assert_eq!(history.len(), 1);
    assert_eq!(history.records()[0].failure_count, 1);

    history.append(CheckinRecord::failure("network error", at(5, 10)));
    assert_eq!(history.len(), 1);
    assert_eq!(history.records()[0].failure_count, 2);

    history.append(success_record(5, 12));
    assert_eq!(history.len(), 1);
    assert_eq!(history.records()[0].outcome, Outcome::Success);
    assert_eq!(history.records()[0].failure_count, 2);
}
