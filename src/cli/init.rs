//! inct init command implementation
//!
//! Creates the ledger file (and its directory) with both sheets in place.

use std::path::PathBuf;

use super::LedgerArgs;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for `inct init`
pub struct InitOptions {
    pub ledger: LedgerArgs,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct InitReport {
    store: PathBuf,
    created: bool,
    incidents: usize,
    activity: usize,
}

pub fn run(options: InitOptions) -> Result<()> {
    let tracker = options.ledger.open()?;
    let path = tracker.store().path().to_path_buf();
    let existed = path.exists();

    let workbook = tracker.open_or_create()?;
    let report = InitReport {
        store: path.clone(),
        created: !existed,
        incidents: workbook.incidents()?.row_count(),
        activity: workbook.activity()?.row_count(),
    };

    let header = if report.created {
        "inct init: created ledger"
    } else {
        "inct init: ledger already exists"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("store", path.display().to_string());
    human.push_summary("incidents", report.incidents.to_string());
    human.push_summary("activity", report.activity.to_string());
    human.push_next_step("inct add \"<description>\"");

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "init",
        &report,
        Some(&human),
    )?;

    Ok(())
}
