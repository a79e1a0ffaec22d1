//! inctrack - Incident Tracker Library
//!
//! This library provides the core functionality for the inct CLI tool:
//! a small ledger of incidents and the time spent working on them.
//!
//! # Core Concepts
//!
//! - **Incidents**: a creation date, a ticket id and a one-line description
//! - **Ticket ids**: suggested per day as `TH` + `YYMMDD` + sequence
//! - **Activity**: start/stop sessions per ticket, at most one running
//! - **Ledger file**: both tables live in one JSON workbook that is
//!   rewritten whole on every change
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `inctrack.toml`
//! - `error`: Error types and result aliases
//! - `clock`: Date/time cell formats and the local clock
//! - `store`: Ledger file loading, schema upgrade and saving
//! - `lock`: File locking and atomic writes
//! - `ticket_id`: Date-scoped ticket id suggestions
//! - `incident`: The incidents table
//! - `activity`: The activity sessions table
//! - `consistency`: Cross-table upkeep (rename propagation, `updated_on`)
//! - `tracker`: The operation surface used by front ends
//! - `output`: Human and JSON output for the CLI

pub mod activity;
pub mod cli;
pub mod clock;
pub mod config;
pub mod consistency;
pub mod error;
pub mod incident;
pub mod lock;
pub mod output;
pub mod store;
pub mod ticket_id;
pub mod tracker;

pub use error::{Error, Result};
pub use tracker::Tracker;
