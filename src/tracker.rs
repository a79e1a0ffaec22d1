//! The operation surface used by front ends.
//!
//! [`Tracker`] wires the allocator, the incident repository, the activity
//! ledger and the consistency coordinator to one [`Store`], and sequences
//! the follow-up writes (rename propagation, `updated_on` stamps) that each
//! user action needs. Every call is a full load/mutate/save round trip;
//! multi-step actions are separate round trips and are not atomic together.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::activity::{ActivityInterval, ActivityLedger, StartOutcome};
use crate::clock;
use crate::config::Config;
use crate::consistency::ConsistencyCoordinator;
use crate::error::{Error, Result};
use crate::incident::{normalize_description, IncidentRecord, IncidentRepository};
use crate::store::{Store, Workbook};
use crate::ticket_id::TicketIdAllocator;

/// An incident together with the last time anything happened to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentOverview {
    #[serde(flatten)]
    pub record: IncidentRecord,
    /// Latest of `updated_on`, the creation date and any activity timestamp
    pub last_touched: Option<NaiveDateTime>,
}

/// Row order for incident listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListOrder {
    /// Storage (insertion) order
    #[default]
    Stored,
    /// Newest creation date first; ties and undated rows keep storage order,
    /// undated rows last
    LatestFirst,
}

/// What a rename did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    pub position: usize,
    pub old_ticket_id: String,
    pub new_ticket_id: String,
    /// False when the new id equals the old one and nothing was written
    pub renamed: bool,
    /// Another incident already carried the new id before the rename
    pub duplicate: bool,
    /// Activity rows rewritten to the new id
    pub propagated: usize,
}

#[derive(Debug, Clone)]
pub struct Tracker {
    store: Store,
    allocator: TicketIdAllocator,
    incidents: IncidentRepository,
    activity: ActivityLedger,
    coordinator: ConsistencyCoordinator,
}

impl Tracker {
    pub fn new(store: Store) -> Self {
        Self::with_ticket_prefix(store, crate::ticket_id::DEFAULT_TICKET_PREFIX)
    }

    pub fn with_ticket_prefix(store: Store, prefix: &str) -> Self {
        Self {
            allocator: TicketIdAllocator::with_prefix(store.clone(), prefix),
            incidents: IncidentRepository::new(store.clone()),
            activity: ActivityLedger::new(store.clone()),
            coordinator: ConsistencyCoordinator::new(store.clone()),
            store,
        }
    }

    /// Build a tracker from configuration (store path, corrupt policy, prefix)
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Store::new(config.store.resolve_path()?, config.store.on_corrupt);
        Ok(Self::with_ticket_prefix(store, &config.tickets.prefix))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn open_or_create(&self) -> Result<Workbook> {
        self.store.open_or_create()
    }

    pub fn suggest_ticket_id(&self, date: NaiveDate) -> Result<String> {
        self.allocator.suggest(date)
    }

    /// Record a new incident; an empty ticket id gets the day's suggestion.
    pub fn add_incident(
        &self,
        date: NaiveDate,
        ticket_id: &str,
        description: &str,
    ) -> Result<IncidentRecord> {
        self.add_incident_at(date, ticket_id, description, clock::now())
    }

    pub fn add_incident_at(
        &self,
        date: NaiveDate,
        ticket_id: &str,
        description: &str,
        at: NaiveDateTime,
    ) -> Result<IncidentRecord> {
        if normalize_description(description).is_empty() {
            return Err(Error::InvalidArgument(
                "description cannot be empty".to_string(),
            ));
        }

        let ticket_id = match ticket_id.trim() {
            "" => self.allocator.suggest(date)?,
            given => given.to_string(),
        };

        let position = self.incidents.add_at(date, &ticket_id, description, at)?;
        self.incidents.get(position)
    }

    pub fn list_incidents(&self) -> Result<Vec<IncidentRecord>> {
        self.incidents.list_all()
    }

    /// Every incident with its derived last-touched time, in storage order
    pub fn incident_overview(&self) -> Result<Vec<IncidentOverview>> {
        self.incident_overview_ordered(ListOrder::Stored)
    }

    pub fn incident_overview_ordered(&self, order: ListOrder) -> Result<Vec<IncidentOverview>> {
        let latest_activity = self.activity.latest_touch_by_ticket()?;
        let records = self.incidents.list_all()?;

        let mut overview: Vec<IncidentOverview> = records
            .into_iter()
            .map(|record| {
                let candidates = [
                    record.updated_on,
                    record.created_on.map(clock::start_of_day),
                    latest_activity.get(&record.ticket_id).copied(),
                ];
                let last_touched = candidates.into_iter().flatten().max();
                IncidentOverview {
                    record,
                    last_touched,
                }
            })
            .collect();

        if order == ListOrder::LatestFirst {
            overview.sort_by_key(|entry| std::cmp::Reverse(entry.record.created_on));
        }
        Ok(overview)
    }

    /// Advisory duplicate check for a prospective id
    pub fn ticket_id_in_use(&self, ticket_id: &str, excluding: Option<usize>) -> Result<bool> {
        self.incidents.exists_elsewhere(ticket_id, excluding)
    }

    /// True if any activity row still carries `ticket_id`
    pub fn has_any_activity(&self, ticket_id: &str) -> Result<bool> {
        self.activity.any_for_ticket(ticket_id)
    }

    /// Rename the incident at `position`, optionally carrying the new id
    /// over to its activity rows.
    pub fn rename_ticket(
        &self,
        position: usize,
        new_id: &str,
        propagate: bool,
    ) -> Result<RenameReport> {
        self.rename_ticket_at(position, new_id, propagate, clock::now())
    }

    pub fn rename_ticket_at(
        &self,
        position: usize,
        new_id: &str,
        propagate: bool,
        at: NaiveDateTime,
    ) -> Result<RenameReport> {
        let new_id = new_id.trim();
        if new_id.is_empty() {
            return Err(Error::InvalidArgument(
                "new ticket id cannot be empty".to_string(),
            ));
        }

        let current = self.incidents.get(position)?;
        if current.ticket_id == new_id {
            return Ok(RenameReport {
                position,
                old_ticket_id: current.ticket_id,
                new_ticket_id: new_id.to_string(),
                renamed: false,
                duplicate: false,
                propagated: 0,
            });
        }

        let duplicate = self.incidents.exists_elsewhere(new_id, Some(position))?;
        let old_ticket_id = self.incidents.rename_at(position, new_id, at)?;

        let propagated = if propagate && !old_ticket_id.is_empty() {
            self.coordinator.propagate_rename(&old_ticket_id, new_id)?
        } else {
            0
        };

        Ok(RenameReport {
            position,
            old_ticket_id,
            new_ticket_id: new_id.to_string(),
            renamed: true,
            duplicate,
            propagated,
        })
    }

    pub fn start_activity(&self, ticket_id: &str) -> Result<StartOutcome> {
        self.start_activity_at(ticket_id, clock::now())
    }

    /// Open a session; on success the ticket's incidents are stamped with `at`.
    pub fn start_activity_at(&self, ticket_id: &str, at: NaiveDateTime) -> Result<StartOutcome> {
        let ticket_id = require_ticket(ticket_id)?;
        let outcome = self.activity.start_at(ticket_id, at)?;
        if outcome.started() {
            self.coordinator.recompute_updated_on(ticket_id, at)?;
        }
        Ok(outcome)
    }

    pub fn stop_activity(&self, ticket_id: &str) -> Result<bool> {
        self.stop_activity_at(ticket_id, clock::now())
    }

    /// Close the running session; `false` when there was none.
    pub fn stop_activity_at(&self, ticket_id: &str, at: NaiveDateTime) -> Result<bool> {
        let ticket_id = require_ticket(ticket_id)?;
        let stopped = self.activity.stop_at(ticket_id, at)?;
        if stopped {
            self.coordinator.recompute_updated_on(ticket_id, at)?;
        }
        Ok(stopped)
    }

    /// Overwrite an interval's endpoints and stamp its ticket's incidents
    /// with the new end, or the new start when the interval is left open.
    pub fn edit_activity(
        &self,
        position: usize,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    ) -> Result<ActivityInterval> {
        let interval = self.activity.edit(position, start, end)?;
        if !interval.ticket_id.is_empty() {
            let event_time = end.unwrap_or(start);
            self.coordinator
                .recompute_updated_on(&interval.ticket_id, event_time)?;
        }
        Ok(interval)
    }

    pub fn list_activity(&self, ticket_id: &str) -> Result<Vec<ActivityInterval>> {
        self.activity.list_for_ticket(ticket_id)
    }

    pub fn has_open_activity(&self, ticket_id: &str) -> Result<bool> {
        self.activity.has_open(ticket_id)
    }

    pub fn activity_at(&self, position: usize) -> Result<ActivityInterval> {
        self.activity.get(position)
    }

    pub fn incident_at(&self, position: usize) -> Result<IncidentRecord> {
        self.incidents.get(position)
    }
}

fn require_ticket(ticket_id: &str) -> Result<&str> {
    let ticket_id = ticket_id.trim();
    if ticket_id.is_empty() {
        return Err(Error::InvalidArgument("ticket id cannot be empty".to_string()));
    }
    Ok(ticket_id)
}
