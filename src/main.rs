mod classifier;
mod cli;
mod db;
mod error;
mod export;
mod extract;
mod fmt;
mod importer;
mod logging;
mod models;
mod normalize;
mod patterns;
mod reports;
mod settings;
mod sink;

use clap::Parser;

use cli::{Cli, Commands};
use logging::{init_logging, LogConfig};

fn main() {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose));

    let result = match cli.command {
        Commands::Init { data_dir, timezone } => cli::init::run(data_dir, timezone),
        Commands::Ingest { sms, csv } => cli::ingest::run(sms, csv),
        Commands::Parse { text, date } => cli::parse::run(&text, date),
        Commands::Transactions {
            record_type,
            from_date,
            to_date,
            search,
            json,
        } => cli::transactions::run(record_type, from_date, to_date, search, json),
        Commands::Summary { json } => cli::summary::run(json),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
