//! Date-scoped ticket id suggestions.
//!
//! Ids look like `TH` + `YYMMDD` + a sequence number of at least two digits:
//! `TH25010501`, `TH25010502`, ... The allocator only suggests; nothing is
//! reserved until an incident is actually added with that id.

use chrono::{Datelike, NaiveDate};

use crate::error::{Error, Result};
use crate::store::{incident_cols, Sheet, Store, Workbook};

/// Default prefix placed before the date part
pub const DEFAULT_TICKET_PREFIX: &str = "TH";

/// Minimum width of the per-day sequence number
const SEQUENCE_WIDTH: usize = 2;

/// Highest sequence number that still fits the fixed width
const SEQUENCE_WIDTH_MAX: u64 = 99;

#[derive(Debug, Clone)]
pub struct TicketIdAllocator {
    store: Store,
    prefix: String,
}

impl TicketIdAllocator {
    pub fn new(store: Store) -> Self {
        Self::with_prefix(store, DEFAULT_TICKET_PREFIX)
    }

    pub fn with_prefix(store: Store, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// Suggest the next free id for `date`.
    pub fn suggest(&self, date: NaiveDate) -> Result<String> {
        let workbook = self.store.open_or_create()?;
        suggest_in(&workbook, &self.prefix, date)
    }
}

/// Prefix shared by every id of one calendar day, e.g. `TH250105`
pub fn day_prefix(prefix: &str, date: NaiveDate) -> String {
    format!(
        "{prefix}{:02}{:02}{:02}",
        date.year().rem_euclid(100),
        date.month(),
        date.day()
    )
}

/// Suggest the next id for `date` from an already loaded workbook.
pub fn suggest_in(workbook: &Workbook, prefix: &str, date: NaiveDate) -> Result<String> {
    let day = day_prefix(prefix, date);
    let next = highest_sequence(workbook.incidents()?, &day)?
        .checked_add(1)
        .ok_or_else(|| sequence_exhausted(&day))?;

    if next > SEQUENCE_WIDTH_MAX {
        // Suffix widens past two digits; later scans still parse it since
        // any all-digit tail counts.
        tracing::warn!(day = %day, sequence = next, "more than 99 tickets on one day");
    }

    Ok(format!("{day}{next:0width$}", width = SEQUENCE_WIDTH))
}

/// Largest numeric suffix among ids starting with `day`, or 0
fn highest_sequence(incidents: &Sheet, day: &str) -> Result<u64> {
    let mut highest = 0;
    for tail in (0..incidents.row_count())
        .filter_map(|row| incidents.cell(row, incident_cols::TICKET_ID))
        .filter_map(|ticket| ticket.strip_prefix(day))
        .filter(|tail| !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()))
    {
        // Every all-digit tail counts, so one we cannot represent blocks the day
        let sequence = tail.parse::<u64>().map_err(|_| sequence_exhausted(day))?;
        highest = highest.max(sequence);
    }
    Ok(highest)
}

fn sequence_exhausted(day: &str) -> Error {
    Error::OperationFailed(format!(
        "no further ticket id can be suggested for {day}: the highest sequence is at its limit"
    ))
}
