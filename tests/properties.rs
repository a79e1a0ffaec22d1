//! Ledger-wide invariants checked over short operation sequences.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use inctrack::activity::ActivityInterval;
use inctrack::Tracker;

mod support;

use support::{ts, TestLedger};

fn open_count(intervals: &[ActivityInterval]) -> usize {
    intervals.iter().filter(|i| i.is_open()).count()
}

fn seed(tracker: &Tracker, tickets: &[&str]) {
    let date = NaiveDate::from_ymd_opt(2025, 1, 5).expect("date");
    for ticket in tickets {
        tracker
            .add_incident_at(date, ticket, "seeded", ts("2025-01-05 07:00:00"))
            .expect("add");
    }
}

#[test]
fn at_most_one_open_interval_per_ticket() {
    let ledger = TestLedger::new();
    let tracker = ledger.tracker();
    seed(&tracker, &["A", "B"]);

    let mut at = ts("2025-01-05 08:00:00");
    let script = [
        ("start", "A"),
        ("start", "A"),
        ("start", "B"),
        ("stop", "A"),
        ("stop", "A"),
        ("start", "A"),
        ("start", "B"),
        ("stop", "B"),
        ("start", "A"),
    ];
    for (action, ticket) in script {
        at += Duration::minutes(7);
        match action {
            "start" => {
                tracker.start_activity_at(ticket, at).expect("start");
            }
            _ => {
                tracker.stop_activity_at(ticket, at).expect("stop");
            }
        }
        for t in ["A", "B"] {
            let intervals = tracker.list_activity(t).expect("list");
            assert!(open_count(&intervals) <= 1, "{t} has several open intervals");
            assert_eq!(
                tracker.has_open_activity(t).expect("open"),
                open_count(&intervals) == 1
            );
        }
    }
}

#[test]
fn updated_on_never_precedes_creation_or_goes_backwards() {
    let ledger = TestLedger::new();
    let tracker = ledger.tracker();
    let created = NaiveDate::from_ymd_opt(2025, 1, 10).expect("date");
    tracker
        .add_incident_at(created, "LATE", "created later", ts("2025-01-10 09:00:00"))
        .expect("add");

    // Activity logged with timestamps before the creation date
    tracker
        .start_activity_at("LATE", ts("2025-01-08 09:00:00"))
        .expect("start");
    tracker
        .stop_activity_at("LATE", ts("2025-01-08 10:00:00"))
        .expect("stop");

    let mut previous: Option<NaiveDateTime> = None;
    for (start, end) in [
        ("2025-01-11 08:00:00", Some("2025-01-11 09:00:00")),
        ("2025-01-09 08:00:00", Some("2025-01-09 09:00:00")),
        ("2025-01-12 08:00:00", None),
    ] {
        tracker
            .edit_activity(0, ts(start), end.map(ts))
            .expect("edit");
        let record = tracker.incident_at(0).expect("incident");
        let updated = record.updated_on.expect("updated_on set");
        assert!(updated >= created.and_hms_opt(0, 0, 0).expect("midnight"));
        if let Some(previous) = previous {
            assert!(updated >= previous);
        }
        previous = Some(updated);
    }
    assert_eq!(previous, Some(ts("2025-01-12 08:00:00")));
}

#[test]
fn suggestions_are_unused_and_sequential() {
    let ledger = TestLedger::new();
    let tracker = ledger.tracker();
    let date = NaiveDate::from_ymd_opt(2025, 3, 1).expect("date");

    for n in 1..=12 {
        let suggestion = tracker.suggest_ticket_id(date).expect("suggest");
        assert_eq!(suggestion, format!("TH250301{n:02}"));
        assert!(!tracker.ticket_id_in_use(&suggestion, None).expect("in use"));
        tracker
            .add_incident_at(date, &suggestion, "x", ts("2025-03-01 08:00:00"))
            .expect("add");
    }
}

#[test]
fn propagated_rename_leaves_no_orphans() {
    let ledger = TestLedger::new();
    let tracker = ledger.tracker();
    seed(&tracker, &["OLD", "KEEP"]);
    for (ticket, hour) in [("OLD", 8), ("KEEP", 9), ("OLD", 10)] {
        let start = ts(&format!("2025-01-05 {hour:02}:00:00"));
        tracker.start_activity_at(ticket, start).expect("start");
        tracker
            .stop_activity_at(ticket, start + Duration::minutes(30))
            .expect("stop");
    }

    let report = tracker
        .rename_ticket_at(0, "NEW", true, ts("2025-01-05 12:00:00"))
        .expect("rename");
    assert_eq!(report.propagated, 2);
    assert!(!tracker.has_any_activity("OLD").expect("old"));
    assert_eq!(tracker.list_activity("NEW").expect("new").len(), 2);
    assert_eq!(tracker.list_activity("KEEP").expect("keep").len(), 1);
}

#[test]
fn positions_are_stable_across_appends() {
    let ledger = TestLedger::new();
    let tracker = ledger.tracker();
    seed(&tracker, &["A", "B", "C"]);

    let before: Vec<_> = tracker
        .list_incidents()
        .expect("list")
        .into_iter()
        .map(|r| (r.position, r.ticket_id))
        .collect();
    seed(&tracker, &["D"]);
    tracker
        .rename_ticket_at(1, "B2", false, ts("2025-01-05 12:00:00"))
        .expect("rename");

    let after = tracker.list_incidents().expect("list");
    assert_eq!(after.len(), 4);
    for (position, ticket) in before {
        let record = &after[position];
        assert_eq!(record.position, position);
        if position != 1 {
            assert_eq!(record.ticket_id, ticket);
        }
    }
    assert_eq!(after[1].ticket_id, "B2");
}

#[test]
fn refused_start_and_empty_stop_leave_ledger_untouched() {
    let ledger = TestLedger::new();
    let tracker = ledger.tracker();
    seed(&tracker, &["A"]);

    assert!(!tracker
        .stop_activity_at("A", ts("2025-01-05 08:00:00"))
        .expect("stop"));
    tracker
        .start_activity_at("A", ts("2025-01-05 08:30:00"))
        .expect("start");
    let before = ledger.read_store();

    let outcome = tracker
        .start_activity_at("A", ts("2025-01-05 09:00:00"))
        .expect("start again");
    assert!(!outcome.started());
    assert_eq!(ledger.read_store(), before);

    assert!(!tracker
        .stop_activity_at("B", ts("2025-01-05 09:00:00"))
        .expect("stop other"));
    assert_eq!(ledger.read_store(), before);
}

#[test]
fn rename_does_not_move_updated_on_backwards() {
    let ledger = TestLedger::new();
    let tracker = ledger.tracker();
    seed(&tracker, &["A"]);
    tracker
        .start_activity_at("A", ts("2025-01-05 15:00:00"))
        .expect("start");

    tracker
        .rename_ticket_at(0, "B", true, ts("2025-01-05 10:00:00"))
        .expect("rename");
    let record = tracker.incident_at(0).expect("incident");
    assert_eq!(record.updated_on, Some(ts("2025-01-05 15:00:00")));
}
