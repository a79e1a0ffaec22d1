//! inct incident commands: add, list, suggest, rename

use chrono::{NaiveDate, NaiveDateTime};

use super::LedgerArgs;
use crate::clock;
use crate::error::{Error, Result};
use crate::incident::IncidentRecord;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::tracker::{IncidentOverview, ListOrder};

/// Options for `inct add`
pub struct AddOptions {
    pub description: String,
    pub ticket: Option<String>,
    pub date: Option<String>,
    pub ledger: LedgerArgs,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `inct list`
pub struct ListOptions {
    pub latest_first: bool,
    pub ledger: LedgerArgs,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `inct suggest`
pub struct SuggestOptions {
    pub date: Option<String>,
    pub ledger: LedgerArgs,
    pub json: bool,
    pub quiet: bool,
}

/// Options for `inct rename`
pub struct RenameOptions {
    pub position: usize,
    pub new_id: String,
    pub allow_duplicate: bool,
    pub propagate: bool,
    pub ledger: LedgerArgs,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct AddReport {
    incident: IncidentRecord,
    suggested: bool,
    duplicate: bool,
}

#[derive(serde::Serialize)]
struct ListReport {
    total: usize,
    incidents: Vec<IncidentOverview>,
}

#[derive(serde::Serialize)]
struct SuggestReport {
    date: NaiveDate,
    ticket_id: String,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let tracker = options.ledger.open()?;
    let date = resolve_date(options.date.as_deref())?;
    let ticket = options.ticket.unwrap_or_default();
    let suggested = ticket.trim().is_empty();

    let duplicate = !suggested && tracker.ticket_id_in_use(&ticket, None)?;
    let incident = tracker.add_incident(date, &ticket, &options.description)?;

    let mut human = HumanOutput::new(format!("inct add: {}", incident.ticket_id));
    human.push_summary("position", incident.position.to_string());
    human.push_summary("created", clock::format_date(date));
    human.push_summary("description", incident.description.clone());
    if suggested {
        human.push_detail("ticket id was suggested for the date");
    }
    if duplicate {
        human.push_warning(format!(
            "another incident already uses {}",
            incident.ticket_id
        ));
    }
    human.push_next_step(format!("inct start {}", incident.ticket_id));

    let report = AddReport {
        incident,
        suggested,
        duplicate,
    };
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "add",
        &report,
        Some(&human),
    )?;

    Ok(())
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let tracker = options.ledger.open()?;
    let order = if options.latest_first {
        ListOrder::LatestFirst
    } else {
        ListOrder::Stored
    };
    let incidents = tracker.incident_overview_ordered(order)?;

    let mut human = HumanOutput::new(format!("inct list: {} incident(s)", incidents.len()));
    for overview in &incidents {
        human.push_detail(format_incident(overview));
    }
    if incidents.is_empty() {
        human.push_next_step("inct add \"<description>\"");
    }

    let report = ListReport {
        total: incidents.len(),
        incidents,
    };
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "list",
        &report,
        Some(&human),
    )?;

    Ok(())
}

pub fn run_suggest(options: SuggestOptions) -> Result<()> {
    let tracker = options.ledger.open()?;
    let date = resolve_date(options.date.as_deref())?;
    let ticket_id = tracker.suggest_ticket_id(date)?;

    let mut human = HumanOutput::new(format!("inct suggest: {ticket_id}"));
    human.push_summary("date", clock::format_date(date));

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "suggest",
        &SuggestReport { date, ticket_id },
        Some(&human),
    )?;

    Ok(())
}

pub fn run_rename(options: RenameOptions) -> Result<()> {
    let tracker = options.ledger.open()?;
    let new_id = options.new_id.trim();
    let current = tracker.incident_at(options.position)?;

    if !options.allow_duplicate
        && current.ticket_id != new_id
        && tracker.ticket_id_in_use(new_id, Some(options.position))?
    {
        return Err(Error::InvalidArgument(format!(
            "ticket id '{new_id}' is already used by another incident (pass --allow-duplicate to rename anyway)"
        )));
    }

    let has_history =
        !current.ticket_id.is_empty() && tracker.has_any_activity(&current.ticket_id)?;
    let left_behind = has_history && !options.propagate;

    let report =
        tracker.rename_ticket(options.position, new_id, options.propagate && has_history)?;

    let header = if report.renamed {
        format!(
            "inct rename: {} -> {}",
            report.old_ticket_id, report.new_ticket_id
        )
    } else {
        format!("inct rename: {} unchanged", report.old_ticket_id)
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("position", report.position.to_string());
    if report.renamed {
        human.push_summary("activity rows updated", report.propagated.to_string());
    }
    if report.duplicate {
        human.push_warning(format!(
            "another incident also uses {}",
            report.new_ticket_id
        ));
    }
    if report.renamed && left_behind {
        human.push_warning(format!(
            "activity sessions still reference {}",
            report.old_ticket_id
        ));
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "rename",
        &report,
        Some(&human),
    )?;

    Ok(())
}

fn resolve_date(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        Some(raw) => clock::parse_date_arg(raw),
        None => Ok(clock::today()),
    }
}

fn format_incident(overview: &IncidentOverview) -> String {
    let record = &overview.record;
    let created = record
        .created_on
        .map(clock::format_date)
        .unwrap_or_else(|| "-".to_string());
    format!(
        "#{} {} (created {}, last touched {}): {}",
        record.position,
        display_ticket(&record.ticket_id),
        created,
        format_optional(overview.last_touched),
        record.description
    )
}

fn display_ticket(ticket_id: &str) -> &str {
    if ticket_id.is_empty() {
        "<no ticket>"
    } else {
        ticket_id
    }
}

fn format_optional(at: Option<NaiveDateTime>) -> String {
    at.map(clock::format_timestamp)
        .unwrap_or_else(|| "-".to_string())
}
