//! Cross-sheet upkeep between incidents and activity.
//!
//! Activity rows point at incidents by ticket id text, so a rename has to be
//! carried over to the Activity sheet explicitly, and every activity event
//! has to be reflected in the matching incidents' `updated_on`.

use chrono::NaiveDateTime;

use crate::clock;
use crate::error::Result;
use crate::store::{activity_cols, incident_cols, Store};

#[derive(Debug, Clone)]
pub struct ConsistencyCoordinator {
    store: Store,
}

impl ConsistencyCoordinator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Rewrite `old_ticket_id` to `new_ticket_id` on every activity row.
    ///
    /// Matching is by exact (trimmed) text, so when two incidents share the
    /// old id both of their histories move. Returns the number of rows
    /// changed; nothing is written when that is zero.
    pub fn propagate_rename(&self, old_ticket_id: &str, new_ticket_id: &str) -> Result<usize> {
        let old_ticket_id = old_ticket_id.trim();
        let new_ticket_id = new_ticket_id.trim();

        let mut workbook = self.store.open_or_create()?;
        let activity = workbook.activity_mut()?;

        let matching: Vec<usize> = (0..activity.row_count())
            .filter(|row| activity.cell(*row, activity_cols::TICKET_ID) == Some(old_ticket_id))
            .collect();
        for row in &matching {
            activity.set_cell(*row, activity_cols::TICKET_ID, Some(new_ticket_id.to_string()));
        }

        if !matching.is_empty() {
            self.store.persist(&workbook)?;
        }

        tracing::info!(
            old = %old_ticket_id,
            new = %new_ticket_id,
            rows = matching.len(),
            "rename propagated to activity"
        );
        Ok(matching.len())
    }

    /// Stamp `updated_on = at` on every incident carrying `ticket_id`.
    ///
    /// Callers pass the time of the event they just recorded. The stored
    /// value never moves backwards and never precedes the creation date, so
    /// an edit that rewrites an old interval leaves a later stamp in place.
    /// Returns the number of incidents whose stamp changed.
    pub fn recompute_updated_on(&self, ticket_id: &str, at: NaiveDateTime) -> Result<usize> {
        let ticket_id = ticket_id.trim();
        let mut workbook = self.store.open_or_create()?;
        let incidents = workbook.incidents_mut()?;

        let mut changed = 0;
        for row in 0..incidents.row_count() {
            if incidents.cell(row, incident_cols::TICKET_ID) != Some(ticket_id) {
                continue;
            }

            let current = incidents
                .cell(row, incident_cols::UPDATED_ON)
                .and_then(clock::parse_timestamp);
            let floor = incidents
                .cell(row, incident_cols::CREATED_ON)
                .and_then(clock::parse_date)
                .map(clock::start_of_day);

            let stamp = [current, floor]
                .into_iter()
                .flatten()
                .fold(at, |latest, candidate| latest.max(candidate));
            if Some(stamp) == current {
                continue;
            }

            incidents.set_cell(
                row,
                incident_cols::UPDATED_ON,
                Some(clock::format_timestamp(stamp)),
            );
            changed += 1;
        }

        if changed > 0 {
            self.store.persist(&workbook)?;
        }

        tracing::debug!(ticket_id, incidents = changed, at = %at, "updated_on recomputed");
        Ok(changed)
    }
}
