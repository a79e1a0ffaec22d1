//! Command-line interface for inct
//!
//! This module defines the CLI structure using clap derive macros.
//! Each group of subcommands is defined in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::store::{self, OnCorrupt, Store};
use crate::tracker::Tracker;

mod activity;
mod export;
mod incident;
mod init;

/// inct - incident ledger
///
/// Records incidents with date-based ticket ids and tracks time spent on
/// them as start/stop activity sessions, all in one local ledger file.
#[derive(Parser, Debug)]
#[command(name = "inct")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the ledger file (defaults to the platform data directory)
    #[arg(long, global = true, env = "INCT_STORE")]
    pub store: Option<PathBuf>,

    /// Path to inctrack.toml (defaults to the platform data directory)
    #[arg(long, global = true, env = "INCT_CONFIG")]
    pub config: Option<PathBuf>,

    /// What to do with an unreadable ledger: recreate or fail
    #[arg(long, global = true)]
    pub on_corrupt: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the ledger file if it does not exist yet
    Init,

    /// Record a new incident
    Add {
        /// Incident description; multiple lines are joined with ", "
        #[arg(required = true)]
        description: Vec<String>,

        /// Ticket id (defaults to the next suggested id for the date)
        #[arg(short, long)]
        ticket: Option<String>,

        /// Creation date, YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// List incidents
    List {
        /// Newest creation date first instead of file order
        #[arg(long)]
        latest_first: bool,
    },

    /// Suggest the next free ticket id for a date
    Suggest {
        /// Date, YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Change the ticket id of an incident
    Rename {
        /// Incident position as shown by `inct list`
        position: usize,

        /// New ticket id
        new_id: String,

        /// Rename even if another incident already uses the id
        #[arg(long)]
        allow_duplicate: bool,

        /// Also rewrite the id on the incident's activity sessions
        #[arg(long)]
        propagate: bool,
    },

    /// Start an activity session for a ticket
    Start {
        /// Ticket id
        ticket: String,
    },

    /// Stop the running activity session for a ticket
    Stop {
        /// Ticket id
        ticket: String,
    },

    /// Show whether a ticket has a running session
    Status {
        /// Ticket id
        ticket: String,
    },

    /// List activity sessions for a ticket
    Activity {
        /// Ticket id
        ticket: String,
    },

    /// Overwrite the start and end time of an activity session
    Edit {
        /// Activity position as shown by `inct activity`
        position: usize,

        /// Start time, "YYYY-MM-DD HH:MM:SS"
        #[arg(long)]
        start: String,

        /// End time, "YYYY-MM-DD HH:MM:SS" (keeps the current end when omitted)
        #[arg(long, conflicts_with = "open")]
        end: Option<String>,

        /// Clear the end time so the session is running again
        #[arg(long)]
        open: bool,
    },

    /// Copy the ledger file into another directory
    Export {
        /// Destination directory
        dest: PathBuf,

        /// Replace an existing file at the destination
        #[arg(long)]
        overwrite: bool,
    },
}

/// Where the ledger lives and how to open it, as given on the command line
#[derive(Debug, Clone, Default)]
pub struct LedgerArgs {
    pub store: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub on_corrupt: Option<String>,
}

impl LedgerArgs {
    /// Load the explicit config file, or the one in the data directory.
    pub fn load_config(&self) -> Result<Config> {
        if let Some(path) = &self.config {
            return Config::load(path);
        }
        match store::default_data_dir() {
            Ok(dir) => Ok(Config::load_from_dir(&dir)),
            Err(err) => {
                tracing::debug!(error = %err, "no data directory; using default config");
                Ok(Config::default())
            }
        }
    }

    /// Build a tracker: flags first, then config, then platform defaults
    pub fn open(&self) -> Result<Tracker> {
        let config = self.load_config()?;

        let path = match &self.store {
            Some(path) => path.clone(),
            None => config.store.resolve_path()?,
        };
        let on_corrupt = match &self.on_corrupt {
            Some(raw) => raw.parse::<OnCorrupt>()?,
            None => config.store.on_corrupt,
        };

        tracing::debug!(store = %path.display(), ?on_corrupt, "ledger resolved");
        Ok(Tracker::with_ticket_prefix(
            Store::new(path, on_corrupt),
            config.tickets.prefix.trim(),
        ))
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ledger = LedgerArgs {
            store: self.store,
            config: self.config,
            on_corrupt: self.on_corrupt,
        };
        let json = self.json;
        let quiet = self.quiet;

        match self.command {
            Commands::Init => init::run(init::InitOptions {
                ledger,
                json,
                quiet,
            }),
            Commands::Add {
                description,
                ticket,
                date,
            } => incident::run_add(incident::AddOptions {
                description: description.join(" "),
                ticket,
                date,
                ledger,
                json,
                quiet,
            }),
            Commands::List { latest_first } => incident::run_list(incident::ListOptions {
                latest_first,
                ledger,
                json,
                quiet,
            }),
            Commands::Suggest { date } => incident::run_suggest(incident::SuggestOptions {
                date,
                ledger,
                json,
                quiet,
            }),
            Commands::Rename {
                position,
                new_id,
                allow_duplicate,
                propagate,
            } => incident::run_rename(incident::RenameOptions {
                position,
                new_id,
                allow_duplicate,
                propagate,
                ledger,
                json,
                quiet,
            }),
            Commands::Start { ticket } => activity::run_start(activity::TicketOptions {
                ticket,
                ledger,
                json,
                quiet,
            }),
            Commands::Stop { ticket } => activity::run_stop(activity::TicketOptions {
                ticket,
                ledger,
                json,
                quiet,
            }),
            Commands::Status { ticket } => activity::run_status(activity::TicketOptions {
                ticket,
                ledger,
                json,
                quiet,
            }),
            Commands::Activity { ticket } => activity::run_list(activity::TicketOptions {
                ticket,
                ledger,
                json,
                quiet,
            }),
            Commands::Edit {
                position,
                start,
                end,
                open,
            } => activity::run_edit(activity::EditOptions {
                position,
                start,
                end,
                open,
                ledger,
                json,
                quiet,
            }),
            Commands::Export { dest, overwrite } => export::run(export::ExportOptions {
                dest,
                overwrite,
                ledger,
                json,
                quiet,
            }),
        }
    }
}
