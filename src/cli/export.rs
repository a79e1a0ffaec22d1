//! inct export command implementation
//!
//! Copies the ledger into another directory, e.g. a synced cloud folder.

use std::path::PathBuf;

use super::LedgerArgs;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for `inct export`
pub struct ExportOptions {
    pub dest: PathBuf,
    pub overwrite: bool,
    pub ledger: LedgerArgs,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct ExportReport {
    source: PathBuf,
    destination: PathBuf,
}

pub fn run(options: ExportOptions) -> Result<()> {
    let tracker = options.ledger.open()?;
    let destination = tracker.store().export_to(&options.dest, options.overwrite)?;
    let source = tracker.store().path().to_path_buf();

    let mut human = HumanOutput::new("inct export: copied ledger");
    human.push_summary("from", source.display().to_string());
    human.push_summary("to", destination.display().to_string());

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "export",
        &ExportReport {
            source,
            destination,
        },
        Some(&human),
    )?;

    Ok(())
}
