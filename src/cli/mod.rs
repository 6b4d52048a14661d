pub mod ingest;
pub mod init;
pub mod parse;
pub mod status;
pub mod summary;
pub mod transactions;

use clap::{ArgAction, Parser, Subcommand};

use crate::db::{get_connection, init_db};
use crate::error::{MomoError, Result};
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "momo",
    about = "Turn mobile-money SMS backups and CSV exports into a transaction ledger."
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and create the database.
    Init {
        /// Path for momo data (default: ~/Documents/momo)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// IANA time zone for message dates (default: Africa/Kigali)
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Reload the ledger from an SMS backup and/or a CSV export.
    Ingest {
        /// SMS backup archive (XML)
        #[arg(long)]
        sms: Option<String>,
        /// Provider CSV export
        #[arg(long)]
        csv: Option<String>,
    },
    /// Classify a single message and print the resulting record.
    Parse {
        /// Message body
        text: String,
        /// Message date in epoch milliseconds (default: now)
        #[arg(long)]
        date: Option<String>,
    },
    /// List stored transactions, newest first.
    Transactions {
        /// Exact transaction type, e.g. incoming_money
        #[arg(long = "type")]
        record_type: Option<String>,
        /// Start date: YYYY-MM-DD (inclusive)
        #[arg(long = "from")]
        from_date: Option<String>,
        /// End date: YYYY-MM-DD (inclusive)
        #[arg(long = "to")]
        to_date: Option<String>,
        /// Substring of sender, recipient or message text
        #[arg(long)]
        search: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Totals per type and per month over the last 12 months.
    Summary {
        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Show data locations and ledger counts.
    Status,
}

/// Open the ledger database, failing with a hint when `init` has not run.
pub(crate) fn open_ledger(settings: &Settings) -> Result<rusqlite::Connection> {
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(MomoError::Settings(format!(
            "No database found at {}\nRun `momo init` first.",
            db_path.display()
        )));
    }
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    Ok(conn)
}
