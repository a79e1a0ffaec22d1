//! inct activity commands: start, stop, status, activity, edit

use chrono::{Duration, NaiveDateTime};

use super::LedgerArgs;
use crate::activity::{ActivityInterval, StartOutcome};
use crate::clock;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for commands that act on one ticket
pub struct TicketOptions {
    pub ticket: String,
    pub ledger: LedgerArgs,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `inct edit`
pub struct EditOptions {
    pub position: usize,
    pub start: String,
    pub end: Option<String>,
    pub open: bool,
    pub ledger: LedgerArgs,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct StartReport {
    ticket_id: String,
    #[serde(flatten)]
    outcome: StartOutcome,
}

#[derive(serde::Serialize)]
struct StopReport {
    ticket_id: String,
    stopped: bool,
}

#[derive(serde::Serialize)]
struct StatusReport {
    ticket_id: String,
    running: bool,
    sessions: usize,
    total_seconds: i64,
}

#[derive(serde::Serialize)]
struct ActivityListReport {
    ticket_id: String,
    intervals: Vec<ActivityInterval>,
}

#[derive(serde::Serialize)]
struct EditReport {
    interval: ActivityInterval,
    end_before_start: bool,
}

fn output_options(json: bool, quiet: bool) -> OutputOptions {
    OutputOptions { json, quiet }
}

pub fn run_start(options: TicketOptions) -> Result<()> {
    let tracker = options.ledger.open()?;
    let ticket_id = options.ticket.trim().to_string();
    let outcome = tracker.start_activity(&ticket_id)?;

    let mut human = match outcome {
        StartOutcome::Started(position) => {
            let mut human = HumanOutput::new(format!("inct start: {ticket_id} running"));
            human.push_summary("position", position.to_string());
            human.push_next_step(format!("inct stop {ticket_id}"));
            human
        }
        StartOutcome::AlreadyOpen(position) => {
            let mut human =
                HumanOutput::new(format!("inct start: {ticket_id} is already running"));
            human.push_summary("position", position.to_string());
            human
        }
    };
    if !tracker.ticket_id_in_use(&ticket_id, None)? {
        human.push_warning(format!("no incident uses ticket id {ticket_id}"));
    }

    emit_success(
        output_options(options.json, options.quiet),
        "start",
        &StartReport { ticket_id, outcome },
        Some(&human),
    )?;

    Ok(())
}

pub fn run_stop(options: TicketOptions) -> Result<()> {
    let tracker = options.ledger.open()?;
    let ticket_id = options.ticket.trim().to_string();
    let stopped = tracker.stop_activity(&ticket_id)?;

    let human = if stopped {
        HumanOutput::new(format!("inct stop: {ticket_id} stopped"))
    } else {
        let mut human = HumanOutput::new(format!("inct stop: {ticket_id} was not running"));
        human.push_next_step(format!("inct start {ticket_id}"));
        human
    };

    emit_success(
        output_options(options.json, options.quiet),
        "stop",
        &StopReport { ticket_id, stopped },
        Some(&human),
    )?;

    Ok(())
}

pub fn run_status(options: TicketOptions) -> Result<()> {
    let tracker = options.ledger.open()?;
    let ticket_id = options.ticket.trim().to_string();
    let running = tracker.has_open_activity(&ticket_id)?;
    let intervals = tracker.list_activity(&ticket_id)?;
    let total = total_duration(&intervals, clock::now());

    let state = if running { "running" } else { "stopped" };
    let mut human = HumanOutput::new(format!("inct status: {ticket_id} {state}"));
    human.push_summary("sessions", intervals.len().to_string());
    human.push_summary("time spent", format_duration(total));

    let report = StatusReport {
        ticket_id,
        running,
        sessions: intervals.len(),
        total_seconds: total.num_seconds(),
    };
    emit_success(
        output_options(options.json, options.quiet),
        "status",
        &report,
        Some(&human),
    )?;

    Ok(())
}

pub fn run_list(options: TicketOptions) -> Result<()> {
    let tracker = options.ledger.open()?;
    let ticket_id = options.ticket.trim().to_string();
    let intervals = tracker.list_activity(&ticket_id)?;

    let mut human = HumanOutput::new(format!(
        "inct activity: {ticket_id}, {} session(s)",
        intervals.len()
    ));
    for interval in &intervals {
        human.push_detail(format_interval(interval));
    }

    emit_success(
        output_options(options.json, options.quiet),
        "activity",
        &ActivityListReport {
            ticket_id,
            intervals,
        },
        Some(&human),
    )?;

    Ok(())
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let tracker = options.ledger.open()?;
    let start = clock::parse_timestamp_arg(&options.start)?;
    let end = match (&options.end, options.open) {
        (Some(raw), _) => Some(clock::parse_timestamp_arg(raw)?),
        (None, true) => None,
        (None, false) => {
            let current = tracker.activity_at(options.position)?;
            if !current.is_open() && current.end.is_none() {
                return Err(Error::InvalidArgument(format!(
                    "session #{} has an unreadable end time; pass --end or --open",
                    options.position
                )));
            }
            current.end
        }
    };

    let interval = tracker.edit_activity(options.position, start, end)?;
    let end_before_start = end.is_some_and(|end| end < start);

    let mut human = HumanOutput::new(format!(
        "inct edit: session #{} of {}",
        interval.position, interval.ticket_id
    ));
    human.push_detail(format_interval(&interval));
    if end_before_start {
        human.push_warning("end time is before start time");
    }

    emit_success(
        output_options(options.json, options.quiet),
        "edit",
        &EditReport {
            interval,
            end_before_start,
        },
        Some(&human),
    )?;

    Ok(())
}

/// Sum of closed sessions plus the running one up to `now`
fn total_duration(intervals: &[ActivityInterval], now: NaiveDateTime) -> Duration {
    intervals
        .iter()
        .filter_map(|interval| {
            let start = interval.start?;
            let end = if interval.is_open() { now } else { interval.end? };
            Some((end - start).max(Duration::zero()))
        })
        .fold(Duration::zero(), |total, span| total + span)
}

fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes();
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

fn format_interval(interval: &ActivityInterval) -> String {
    let start = interval
        .start
        .map(clock::format_timestamp)
        .unwrap_or_else(|| "-".to_string());
    let end = match (interval.end, interval.is_open()) {
        (Some(end), _) => clock::format_timestamp(end),
        (None, true) => "running".to_string(),
        (None, false) => "?".to_string(),
    };
    format!("#{} {start} .. {end}", interval.position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> NaiveDateTime {
        clock::parse_timestamp(raw).expect("timestamp")
    }

    fn interval(start: Option<&str>, end: Option<&str>) -> ActivityInterval {
        ActivityInterval {
            position: 0,
            ticket_id: "T".to_string(),
            start: start.map(ts),
            end: end.map(ts),
            open: end.is_none(),
        }
    }

    #[test]
    fn total_counts_running_session_until_now() {
        let intervals = vec![
            interval(Some("2025-01-05 09:00:00"), Some("2025-01-05 10:30:00")),
            interval(Some("2025-01-05 11:00:00"), None),
            interval(None, Some("2025-01-05 12:00:00")),
        ];
        let total = total_duration(&intervals, ts("2025-01-05 11:15:00"));
        assert_eq!(total.num_minutes(), 105);
        assert_eq!(format_duration(total), "1h 45m");
    }

    #[test]
    fn unreadable_end_is_closed_not_running() {
        let mut broken = interval(Some("2025-01-05 09:00:00"), None);
        broken.open = false;
        assert_eq!(format_interval(&broken), "#0 2025-01-05 09:00:00 .. ?");
        assert_eq!(total_duration(&[broken], ts("2025-01-05 11:00:00")), Duration::zero());

        let running = interval(Some("2025-01-05 09:00:00"), None);
        assert_eq!(format_interval(&running), "#0 2025-01-05 09:00:00 .. running");
    }

    #[test]
    fn backwards_interval_counts_as_zero() {
        let intervals = vec![interval(
            Some("2025-01-05 10:00:00"),
            Some("2025-01-05 09:00:00"),
        )];
        assert_eq!(total_duration(&intervals, ts("2025-01-05 11:00:00")), Duration::zero());
    }
}
