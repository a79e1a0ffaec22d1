//! Activity ledger: timed work sessions per ticket (the Activity sheet).
//!
//! Each ticket is either Stopped (no open interval) or Running (exactly one
//! interval without an end). `start` refuses to open a second interval and
//! `stop` closes the most recently added open one.
//!
//! Intervals reference incidents by ticket id text, not by position.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::clock;
use crate::error::{Error, Result};
use crate::store::{activity_cols, Sheet, Store};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityInterval {
    /// Zero-based data row in the Activity sheet
    pub position: usize,
    pub ticket_id: String,
    /// `None` only when the cell is missing or unparseable
    pub start: Option<NaiveDateTime>,
    /// `None` when the session is running or the cell is unparseable
    pub end: Option<NaiveDateTime>,
    /// Running iff the End Time cell is empty
    pub open: bool,
}

impl ActivityInterval {
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn from_sheet(sheet: &Sheet, position: usize) -> Self {
        Self {
            position,
            ticket_id: sheet
                .cell(position, activity_cols::TICKET_ID)
                .unwrap_or_default()
                .to_string(),
            start: sheet
                .cell(position, activity_cols::START)
                .and_then(clock::parse_timestamp),
            end: sheet
                .cell(position, activity_cols::END)
                .and_then(clock::parse_timestamp),
            open: row_is_open(sheet, position),
        }
    }
}

/// Result of asking the ledger to open a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "position", rename_all = "snake_case")]
pub enum StartOutcome {
    /// A new open interval was appended at this position
    Started(usize),
    /// The ticket already has an open interval at this position; nothing written
    AlreadyOpen(usize),
}

impl StartOutcome {
    pub fn started(&self) -> bool {
        matches!(self, StartOutcome::Started(_))
    }
}

#[derive(Debug, Clone)]
pub struct ActivityLedger {
    store: Store,
}

impl ActivityLedger {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Open a session for `ticket_id` starting now.
    pub fn start(&self, ticket_id: &str) -> Result<StartOutcome> {
        self.start_at(ticket_id, clock::now())
    }

    /// Open a session for `ticket_id` starting at `at`.
    pub fn start_at(&self, ticket_id: &str, at: NaiveDateTime) -> Result<StartOutcome> {
        let ticket_id = ticket_id.trim();
        let mut workbook = self.store.open_or_create()?;
        let activity = workbook.activity_mut()?;

        if let Some(open) = latest_open_row(activity, ticket_id) {
            tracing::debug!(ticket_id, position = open, "session already open");
            return Ok(StartOutcome::AlreadyOpen(open));
        }

        let position = activity.append(vec![
            Some(ticket_id.to_string()),
            Some(clock::format_timestamp(at)),
            None,
        ]);
        self.store.persist(&workbook)?;

        tracing::info!(ticket_id, position, "session started");
        Ok(StartOutcome::Started(position))
    }

    /// Close the running session for `ticket_id` now.
    pub fn stop(&self, ticket_id: &str) -> Result<bool> {
        self.stop_at(ticket_id, clock::now())
    }

    /// Close the running session for `ticket_id` at `at`.
    ///
    /// Returns `false` without writing anything when no session is open.
    pub fn stop_at(&self, ticket_id: &str, at: NaiveDateTime) -> Result<bool> {
        let ticket_id = ticket_id.trim();
        let mut workbook = self.store.open_or_create()?;
        let activity = workbook.activity_mut()?;

        let Some(position) = latest_open_row(activity, ticket_id) else {
            tracing::debug!(ticket_id, "no open session to stop");
            return Ok(false);
        };

        activity.set_cell(
            position,
            activity_cols::END,
            Some(clock::format_timestamp(at)),
        );
        self.store.persist(&workbook)?;

        tracing::info!(ticket_id, position, "session stopped");
        Ok(true)
    }

    /// True if `ticket_id` has a running session
    pub fn has_open(&self, ticket_id: &str) -> Result<bool> {
        let workbook = self.store.open_or_create()?;
        Ok(latest_open_row(workbook.activity()?, ticket_id.trim()).is_some())
    }

    /// True if any interval, open or closed, mentions `ticket_id`
    pub fn any_for_ticket(&self, ticket_id: &str) -> Result<bool> {
        let ticket_id = ticket_id.trim();
        let workbook = self.store.open_or_create()?;
        let activity = workbook.activity()?;
        Ok((0..activity.row_count())
            .any(|row| activity.cell(row, activity_cols::TICKET_ID) == Some(ticket_id)))
    }

    /// Intervals of `ticket_id`, earliest start first.
    ///
    /// Rows whose start cannot be parsed sort before everything else; ties
    /// keep storage order.
    pub fn list_for_ticket(&self, ticket_id: &str) -> Result<Vec<ActivityInterval>> {
        let ticket_id = ticket_id.trim();
        let workbook = self.store.open_or_create()?;
        let activity = workbook.activity()?;

        let mut intervals: Vec<_> = (0..activity.row_count())
            .filter(|row| activity.cell(*row, activity_cols::TICKET_ID) == Some(ticket_id))
            .map(|row| ActivityInterval::from_sheet(activity, row))
            .collect();
        // Option orders None before Some
        intervals.sort_by_key(|interval| interval.start);
        Ok(intervals)
    }

    /// The interval at `position`
    pub fn get(&self, position: usize) -> Result<ActivityInterval> {
        let workbook = self.store.open_or_create()?;
        let activity = workbook.activity()?;
        if position >= activity.row_count() {
            return Err(Error::ActivityNotFound(position));
        }
        Ok(ActivityInterval::from_sheet(activity, position))
    }

    /// Overwrite both endpoints of the interval at `position`.
    ///
    /// The ticket id cell is rewritten with its current (trimmed) value. No
    /// ordering or overlap checks are made: `end` may precede `start`.
    pub fn edit(
        &self,
        position: usize,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    ) -> Result<ActivityInterval> {
        let mut workbook = self.store.open_or_create()?;
        let activity = workbook.activity_mut()?;
        if position >= activity.row_count() {
            return Err(Error::ActivityNotFound(position));
        }

        let ticket_id = activity
            .cell(position, activity_cols::TICKET_ID)
            .unwrap_or_default()
            .to_string();
        if end.is_some_and(|end| end < start) {
            tracing::warn!(ticket_id = %ticket_id, position, "edited interval ends before it starts");
        }

        activity.set_cell(position, activity_cols::TICKET_ID, Some(ticket_id.clone()));
        activity.set_cell(
            position,
            activity_cols::START,
            Some(clock::format_timestamp(start)),
        );
        activity.set_cell(position, activity_cols::END, end.map(clock::format_timestamp));
        self.store.persist(&workbook)?;

        tracing::info!(ticket_id = %ticket_id, position, "session edited");
        Ok(ActivityInterval {
            position,
            ticket_id,
            start: Some(start),
            end,
            open: end.is_none(),
        })
    }

    /// Latest start or end timestamp seen for every ticket
    pub fn latest_touch_by_ticket(&self) -> Result<HashMap<String, NaiveDateTime>> {
        let workbook = self.store.open_or_create()?;
        let activity = workbook.activity()?;

        let mut latest: HashMap<String, NaiveDateTime> = HashMap::new();
        for row in 0..activity.row_count() {
            let Some(ticket_id) = activity.cell(row, activity_cols::TICKET_ID) else {
                continue;
            };
            let interval = ActivityInterval::from_sheet(activity, row);
            for at in [interval.start, interval.end].into_iter().flatten() {
                latest
                    .entry(ticket_id.to_string())
                    .and_modify(|prev| {
                        if at > *prev {
                            *prev = at;
                        }
                    })
                    .or_insert(at);
            }
        }
        Ok(latest)
    }
}

/// An interval is open iff its End Time cell is empty; unparseable text
/// counts as closed.
fn row_is_open(activity: &Sheet, row: usize) -> bool {
    activity.cell(row, activity_cols::END).is_none()
}

/// Scan from the newest row backwards for an open interval of `ticket_id`.
fn latest_open_row(activity: &Sheet, ticket_id: &str) -> Option<usize> {
    (0..activity.row_count()).rev().find(|row| {
        activity.cell(*row, activity_cols::TICKET_ID) == Some(ticket_id)
            && row_is_open(activity, *row)
    })
}
