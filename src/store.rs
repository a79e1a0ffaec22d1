//! Storage layer for inctrack
//!
//! The ledger is one JSON file shaped like a workbook of named sheets, each
//! with a fixed header row and rows of optional text cells:
//!
//! ```text
//! <data dir>/
//!   incident_numbers.json        # the workbook (INCIDENTS + Activity)
//!   incident_numbers.json.lock   # sidecar held while the file is replaced
//!   inctrack.toml                # optional configuration
//! ```
//!
//! There is no in-memory cache. Every operation loads the file with
//! [`Store::open_or_create`], mutates the returned [`Workbook`] and hands it
//! back to [`Store::persist`], which replaces the whole file in one shot.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::clock;
use crate::error::{Error, Result};
use crate::lock;

/// File name of the ledger inside the data directory
pub const STORE_FILE_NAME: &str = "incident_numbers.json";

/// Format marker written at the top of every ledger file
pub const WORKBOOK_FORMAT: &str = "inctrack.workbook.v1";

pub const INCIDENTS_SHEET: &str = "INCIDENTS";
pub const INCIDENTS_HEADER: [&str; 4] = ["Created On", "Updated On", "Ticket ID", "Description"];

pub const ACTIVITY_SHEET: &str = "Activity";
pub const ACTIVITY_HEADER: [&str; 3] = ["Ticket ID", "Start Time", "End Time"];

/// Column indexes of the INCIDENTS sheet
pub mod incident_cols {
    pub const CREATED_ON: usize = 0;
    pub const UPDATED_ON: usize = 1;
    pub const TICKET_ID: usize = 2;
    pub const DESCRIPTION: usize = 3;
}

/// Column indexes of the Activity sheet
pub mod activity_cols {
    pub const TICKET_ID: usize = 0;
    pub const START: usize = 1;
    pub const END: usize = 2;
}

/// What to do when the ledger file exists but cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnCorrupt {
    /// Move the unreadable file aside and start a fresh, empty ledger
    #[default]
    Recreate,
    /// Report `Error::CorruptStore` and leave the file untouched
    Fail,
}

impl FromStr for OnCorrupt {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "recreate" => Ok(OnCorrupt::Recreate),
            "fail" => Ok(OnCorrupt::Fail),
            _ => Err(Error::InvalidArgument(format!(
                "invalid corrupt-file policy '{}': must be recreate or fail",
                s
            ))),
        }
    }
}

/// One row of a sheet; `None` is an empty cell
pub type Row = Vec<Option<String>>;

/// A named table with a header row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub header: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: &str, header: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Cell text, trimmed; empty cells read as `None`
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Overwrite one cell, growing the row if it is short
    pub fn set_cell(&mut self, row: usize, col: usize, value: Option<String>) {
        if let Some(cells) = self.rows.get_mut(row) {
            if cells.len() <= col {
                cells.resize(col + 1, None);
            }
            cells[col] = value;
        }
    }

    /// Append a row and return its position
    pub fn append(&mut self, row: Row) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn header_is_blank(&self) -> bool {
        self.header.iter().all(|h| h.trim().is_empty())
    }

    fn set_header(&mut self, header: &[&str]) {
        self.header = header.iter().map(|h| h.to_string()).collect();
    }
}

/// The full in-memory table set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbook {
    pub format: String,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self {
            format: WORKBOOK_FORMAT.to_string(),
            sheets: Vec::new(),
        }
    }
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    /// The INCIDENTS sheet. Present on every workbook returned by the store.
    pub fn incidents(&self) -> Result<&Sheet> {
        self.sheet(INCIDENTS_SHEET).ok_or_else(|| missing_sheet(INCIDENTS_SHEET))
    }

    pub fn incidents_mut(&mut self) -> Result<&mut Sheet> {
        self.sheet_mut(INCIDENTS_SHEET)
            .ok_or_else(|| missing_sheet(INCIDENTS_SHEET))
    }

    /// The Activity sheet. Present on every workbook returned by the store.
    pub fn activity(&self) -> Result<&Sheet> {
        self.sheet(ACTIVITY_SHEET).ok_or_else(|| missing_sheet(ACTIVITY_SHEET))
    }

    pub fn activity_mut(&mut self) -> Result<&mut Sheet> {
        self.sheet_mut(ACTIVITY_SHEET)
            .ok_or_else(|| missing_sheet(ACTIVITY_SHEET))
    }

    /// Bring both sheets up to the current schema.
    ///
    /// Returns `true` if anything changed and the workbook must be saved.
    pub fn ensure_schema(&mut self) -> bool {
        let mut dirty = false;

        if self.format != WORKBOOK_FORMAT {
            self.format = WORKBOOK_FORMAT.to_string();
            dirty = true;
        }

        match self.sheet_mut(INCIDENTS_SHEET) {
            None => {
                self.sheets.push(Sheet::new(INCIDENTS_SHEET, &INCIDENTS_HEADER));
                dirty = true;
            }
            Some(sheet) => {
                if sheet.header_is_blank() {
                    sheet.set_header(&INCIDENTS_HEADER);
                    dirty = true;
                } else if sheet.header.len() < INCIDENTS_HEADER.len()
                    || sheet.header[incident_cols::UPDATED_ON].trim()
                        != INCIDENTS_HEADER[incident_cols::UPDATED_ON]
                {
                    // Older ledgers had no "Updated On" column
                    for row in &mut sheet.rows {
                        let at = incident_cols::UPDATED_ON.min(row.len());
                        row.insert(at, None);
                    }
                    sheet.set_header(&INCIDENTS_HEADER);
                    dirty = true;
                }
            }
        }

        match self.sheet_mut(ACTIVITY_SHEET) {
            None => {
                self.sheets.push(Sheet::new(ACTIVITY_SHEET, &ACTIVITY_HEADER));
                dirty = true;
            }
            Some(sheet) => {
                if sheet.header_is_blank() {
                    sheet.set_header(&ACTIVITY_HEADER);
                    dirty = true;
                }
            }
        }

        dirty
    }
}

fn missing_sheet(name: &str) -> Error {
    Error::OperationFailed(format!("ledger has no '{name}' sheet"))
}

/// Handle on the ledger file. Cheap to clone; holds no open file.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    on_corrupt: OnCorrupt,
}

impl Store {
    /// Create a store handle for the given ledger path
    pub fn new(path: impl Into<PathBuf>, on_corrupt: OnCorrupt) -> Self {
        Self {
            path: path.into(),
            on_corrupt,
        }
    }

    /// Path to the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path to the sidecar lock taken while the ledger is replaced
    pub fn lock_path(&self) -> PathBuf {
        lock::lock_path_for(&self.path)
    }

    pub fn on_corrupt(&self) -> OnCorrupt {
        self.on_corrupt
    }

    /// Load the ledger, creating or repairing it as needed.
    ///
    /// A missing file yields a fresh workbook; an unreadable one is handled
    /// per [`OnCorrupt`]. If the file had to be created or its schema
    /// upgraded, it is persisted before returning.
    pub fn open_or_create(&self) -> Result<Workbook> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let (mut workbook, mut dirty) = if self.path.exists() {
            match self.read_workbook() {
                Ok(workbook) => (workbook, false),
                Err(reason) => (self.recover_corrupt(reason)?, true),
            }
        } else {
            tracing::debug!(path = %self.path.display(), "creating new ledger");
            (Workbook::default(), true)
        };

        if workbook.ensure_schema() {
            dirty = true;
        }

        if dirty {
            self.persist(&workbook)?;
        }

        Ok(workbook)
    }

    /// Replace the ledger file with the given workbook.
    ///
    /// Fails with `Error::LockedResource` if another process holds the file.
    pub fn persist(&self, workbook: &Workbook) -> Result<()> {
        let json = serde_json::to_string_pretty(workbook)?;
        lock::write_atomic_locked(&self.path, json.as_bytes())?;
        tracing::debug!(
            path = %self.path.display(),
            bytes = json.len(),
            "ledger saved"
        );
        Ok(())
    }

    /// Copy the ledger into `dest_dir` under its own file name.
    ///
    /// The copy is written to a temp file in `dest_dir` and renamed into
    /// place, so the destination is never left half written.
    pub fn export_to(&self, dest_dir: &Path, overwrite: bool) -> Result<PathBuf> {
        if !dest_dir.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "export destination is not a directory: {}",
                dest_dir.display()
            )));
        }

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| STORE_FILE_NAME.into());
        let dest_path = dest_dir.join(file_name);

        if dest_path.exists() && !overwrite {
            return Err(Error::InvalidArgument(format!(
                "{} already exists (pass overwrite to replace it)",
                dest_path.display()
            )));
        }

        let workbook = self.open_or_create()?;
        let json = serde_json::to_string_pretty(&workbook)?;

        let mut temp = tempfile::NamedTempFile::new_in(dest_dir)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&dest_path).map_err(|err| {
            if lock::is_held_elsewhere(&err.error) {
                Error::LockedResource(dest_path.clone())
            } else {
                Error::Io(err.error)
            }
        })?;

        tracing::info!(dest = %dest_path.display(), "ledger exported");
        Ok(dest_path)
    }

    fn read_workbook(&self) -> std::result::Result<Workbook, String> {
        let content = fs::read_to_string(&self.path).map_err(|e| e.to_string())?;
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }

    fn recover_corrupt(&self, reason: String) -> Result<Workbook> {
        match self.on_corrupt {
            OnCorrupt::Fail => Err(Error::CorruptStore {
                path: self.path.clone(),
                reason,
            }),
            OnCorrupt::Recreate => {
                let backup = self.corrupt_backup_path();
                fs::rename(&self.path, &backup)?;
                tracing::warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    %reason,
                    "ledger unreadable; moved aside and starting empty"
                );
                Ok(Workbook::default())
            }
        }
    }

    fn corrupt_backup_path(&self) -> PathBuf {
        let stamp = clock::now().format("%Y%m%d%H%M%S");
        let mut candidate = PathBuf::from(format!("{}.corrupt-{stamp}", self.path.display()));
        let mut n = 1;
        while candidate.exists() {
            candidate = PathBuf::from(format!("{}.corrupt-{stamp}-{n}", self.path.display()));
            n += 1;
        }
        candidate
    }
}

/// Default data directory for this platform
///
/// Linux: `~/.local/share/IncidentTracker`, macOS:
/// `~/Library/Application Support/IncidentTracker`, Windows:
/// `%LOCALAPPDATA%\IncidentTracker\data`.
pub fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "IncidentTracker")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .ok_or_else(|| {
            Error::OperationFailed("could not determine a home directory".to_string())
        })
}

/// Default ledger location: `<data dir>/incident_numbers.json`
pub fn default_store_path() -> Result<PathBuf> {
    Ok(default_data_dir()?.join(STORE_FILE_NAME))
}
