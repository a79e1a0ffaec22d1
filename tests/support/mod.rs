use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use inctrack::clock;
use inctrack::store::{OnCorrupt, Store};
use inctrack::Tracker;
use tempfile::TempDir;

pub struct TestLedger {
    dir: TempDir,
}

impl TestLedger {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("incident_numbers.json")
    }

    pub fn store(&self) -> Store {
        Store::new(self.store_path(), OnCorrupt::Recreate)
    }

    pub fn tracker(&self) -> Tracker {
        Tracker::new(self.store())
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_store(&self) -> String {
        fs::read_to_string(self.store_path()).expect("read ledger")
    }
}

pub fn ts(raw: &str) -> NaiveDateTime {
    clock::parse_timestamp(raw).expect("timestamp")
}
