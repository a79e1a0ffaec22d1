//! Incident records: the INCIDENTS sheet.
//!
//! An incident is created once with a date, a ticket id and a description,
//! and afterwards only its ticket id (rename) and its derived `updated_on`
//! change. Incidents are never deleted, so a row's position is a stable
//! handle for targeted updates.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::clock;
use crate::error::{Error, Result};
use crate::store::{incident_cols, Sheet, Store};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentRecord {
    /// Zero-based data row in the INCIDENTS sheet
    pub position: usize,
    pub created_on: Option<NaiveDate>,
    pub updated_on: Option<NaiveDateTime>,
    pub ticket_id: String,
    pub description: String,
}

impl IncidentRecord {
    /// Read the record at `position`, or `None` for a blank row
    pub fn from_sheet(sheet: &Sheet, position: usize) -> Option<Self> {
        let row = sheet.rows.get(position)?;
        let blank = row
            .iter()
            .all(|cell| cell.as_deref().map(str::trim).unwrap_or("").is_empty());
        if blank {
            return None;
        }

        Some(Self {
            position,
            created_on: sheet
                .cell(position, incident_cols::CREATED_ON)
                .and_then(clock::parse_date),
            updated_on: sheet
                .cell(position, incident_cols::UPDATED_ON)
                .and_then(clock::parse_timestamp),
            ticket_id: sheet
                .cell(position, incident_cols::TICKET_ID)
                .unwrap_or_default()
                .to_string(),
            description: sheet
                .cell(position, incident_cols::DESCRIPTION)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// Collapse multi-line input into one line.
///
/// Line endings are unified, each line is trimmed, blank lines are dropped
/// and the rest are joined with `", "`.
pub fn normalize_description(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone)]
pub struct IncidentRepository {
    store: Store,
}

impl IncidentRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Append a new incident stamped with the current time.
    pub fn add(&self, date: NaiveDate, ticket_id: &str, description: &str) -> Result<usize> {
        self.add_at(date, ticket_id, description, clock::now())
    }

    /// Append a new incident whose `updated_on` is `at`.
    ///
    /// The ticket id is stored as given; suggesting one for an empty input
    /// is the caller's job.
    pub fn add_at(
        &self,
        date: NaiveDate,
        ticket_id: &str,
        description: &str,
        at: NaiveDateTime,
    ) -> Result<usize> {
        let mut workbook = self.store.open_or_create()?;
        let position = workbook.incidents_mut()?.append(vec![
            Some(clock::format_date(date)),
            Some(clock::format_timestamp(at)),
            Some(ticket_id.trim().to_string()),
            Some(normalize_description(description)),
        ]);
        self.store.persist(&workbook)?;

        tracing::info!(position, ticket_id = %ticket_id.trim(), "incident added");
        Ok(position)
    }

    /// Every non-blank incident, in insertion order
    pub fn list_all(&self) -> Result<Vec<IncidentRecord>> {
        let workbook = self.store.open_or_create()?;
        let incidents = workbook.incidents()?;
        Ok((0..incidents.row_count())
            .filter_map(|position| IncidentRecord::from_sheet(incidents, position))
            .collect())
    }

    /// The incident at `position`
    pub fn get(&self, position: usize) -> Result<IncidentRecord> {
        let workbook = self.store.open_or_create()?;
        IncidentRecord::from_sheet(workbook.incidents()?, position)
            .ok_or(Error::IncidentNotFound(position))
    }

    /// True if a row other than `excluding` already carries `ticket_id`.
    pub fn exists_elsewhere(&self, ticket_id: &str, excluding: Option<usize>) -> Result<bool> {
        let ticket_id = ticket_id.trim();
        let workbook = self.store.open_or_create()?;
        let incidents = workbook.incidents()?;
        Ok((0..incidents.row_count())
            .filter(|row| Some(*row) != excluding)
            .any(|row| incidents.cell(row, incident_cols::TICKET_ID) == Some(ticket_id)))
    }

    /// Rewrite the ticket id at `position`, stamping `updated_on` with now.
    pub fn rename(&self, position: usize, new_ticket_id: &str) -> Result<String> {
        self.rename_at(position, new_ticket_id, clock::now())
    }

    /// Rewrite the ticket id at `position` and return the previous id.
    ///
    /// `updated_on` becomes `at` unless it already holds a later time.
    /// Activity rows are not touched; see
    /// [`ConsistencyCoordinator::propagate_rename`](crate::consistency::ConsistencyCoordinator::propagate_rename).
    pub fn rename_at(
        &self,
        position: usize,
        new_ticket_id: &str,
        at: NaiveDateTime,
    ) -> Result<String> {
        let mut workbook = self.store.open_or_create()?;
        let incidents = workbook.incidents_mut()?;
        if IncidentRecord::from_sheet(incidents, position).is_none() {
            return Err(Error::IncidentNotFound(position));
        }

        let old = incidents
            .cell(position, incident_cols::TICKET_ID)
            .unwrap_or_default()
            .to_string();
        let new_ticket_id = new_ticket_id.trim();
        // updated_on only moves forward
        let stamp = incidents
            .cell(position, incident_cols::UPDATED_ON)
            .and_then(clock::parse_timestamp)
            .map_or(at, |current| current.max(at));
        incidents.set_cell(
            position,
            incident_cols::TICKET_ID,
            Some(new_ticket_id.to_string()),
        );
        incidents.set_cell(
            position,
            incident_cols::UPDATED_ON,
            Some(clock::format_timestamp(stamp)),
        );
        self.store.persist(&workbook)?;

        tracing::info!(position, old = %old, new = %new_ticket_id, "ticket renamed");
        Ok(old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OnCorrupt;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Store, IncidentRepository) {
        let temp = TempDir::new().unwrap();
        let store = Store::new(temp.path().join("ledger.json"), OnCorrupt::Recreate);
        let repo = IncidentRepository::new(store.clone());
        (temp, store, repo)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(raw: &str) -> NaiveDateTime {
        clock::parse_timestamp(raw).unwrap()
    }

    #[test]
    fn normalize_collapses_lines() {
        assert_eq!(normalize_description("  a \r\n\n b \r c "), "a, b, c");
        assert_eq!(normalize_description("single line"), "single line");
        assert_eq!(normalize_description(""), "");
        assert_eq!(normalize_description("\n \r\n\t"), "");
    }

    #[test]
    fn add_then_list_keeps_insertion_order() {
        let (_temp, _store, repo) = setup();

        let first = repo
            .add_at(date(2025, 1, 5), "TH25010501", "disk full\nserver A", ts("2025-01-05 08:00:00"))
            .unwrap();
        let second = repo
            .add_at(date(2025, 1, 4), "TH25010401", "vpn down", ts("2025-01-05 08:05:00"))
            .unwrap();
        assert_eq!((first, second), (0, 1));

        let all = repo.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].ticket_id, "TH25010501");
        assert_eq!(all[0].description, "disk full, server A");
        assert_eq!(all[0].created_on, Some(date(2025, 1, 5)));
        assert_eq!(all[0].updated_on, Some(ts("2025-01-05 08:00:00")));
        assert_eq!(all[1].position, 1);
        assert_eq!(all[1].ticket_id, "TH25010401");
    }

    #[test]
    fn blank_rows_are_skipped_but_keep_positions() {
        let (_temp, store, repo) = setup();
        repo.add_at(date(2025, 1, 5), "A", "one", ts("2025-01-05 08:00:00"))
            .unwrap();

        let mut wb = store.open_or_create().unwrap();
        wb.incidents_mut().unwrap().append(vec![None, None, Some("  ".to_string()), None]);
        store.persist(&wb).unwrap();

        let pos = repo
            .add_at(date(2025, 1, 5), "B", "two", ts("2025-01-05 08:00:00"))
            .unwrap();
        assert_eq!(pos, 2);

        let all = repo.list_all().unwrap();
        let positions: Vec<_> = all.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 2]);
        assert!(matches!(repo.get(1), Err(Error::IncidentNotFound(1))));
    }

    #[test]
    fn exists_elsewhere_excludes_own_row() {
        let (_temp, _store, repo) = setup();
        let a = repo
            .add_at(date(2025, 1, 5), "DUP", "one", ts("2025-01-05 08:00:00"))
            .unwrap();

        assert!(!repo.exists_elsewhere("DUP", Some(a)).unwrap());
        assert!(repo.exists_elsewhere("DUP", None).unwrap());
        assert!(!repo.exists_elsewhere("OTHER", None).unwrap());

        let b = repo
            .add_at(date(2025, 1, 5), "DUP", "two", ts("2025-01-05 08:01:00"))
            .unwrap();
        assert!(repo.exists_elsewhere("DUP", Some(b)).unwrap());
    }

    #[test]
    fn rename_rewrites_id_and_stamps_updated_on() {
        let (_temp, _store, repo) = setup();
        let pos = repo
            .add_at(date(2025, 1, 5), "TH25010501", "one", ts("2025-01-05 08:00:00"))
            .unwrap();

        let old = repo
            .rename_at(pos, " INC-9 ", ts("2025-01-06 10:00:00"))
            .unwrap();
        assert_eq!(old, "TH25010501");

        let record = repo.get(pos).unwrap();
        assert_eq!(record.ticket_id, "INC-9");
        assert_eq!(record.updated_on, Some(ts("2025-01-06 10:00:00")));
        assert_eq!(record.created_on, Some(date(2025, 1, 5)));
    }

    #[test]
    fn rename_keeps_later_stamp() {
        let (_temp, _store, repo) = setup();
        let pos = repo
            .add_at(date(2025, 1, 5), "A", "one", ts("2025-01-05 12:00:00"))
            .unwrap();

        repo.rename_at(pos, "B", ts("2025-01-05 09:00:00")).unwrap();
        let record = repo.get(pos).unwrap();
        assert_eq!(record.ticket_id, "B");
        assert_eq!(record.updated_on, Some(ts("2025-01-05 12:00:00")));
    }

    #[test]
    fn rename_unknown_position_fails() {
        let (_temp, _store, repo) = setup();
        let err = repo.rename_at(3, "X", ts("2025-01-06 10:00:00")).unwrap_err();
        assert!(matches!(err, Error::IncidentNotFound(3)));
    }
}
