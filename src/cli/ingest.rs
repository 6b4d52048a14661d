use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::classifier::Classifier;
use crate::db::clear_transactions;
use crate::error::{MomoError, Result};
use crate::importer::{ingest_export, ingest_sms};
use crate::patterns::Registry;
use crate::settings::load_settings;
use crate::sink::{count_entries, FileSink};

/// Every given source must be a readable file before the ledger is touched.
fn check_inputs(paths: &[Option<&Path>]) -> Result<()> {
    for path in paths.iter().flatten() {
        if !path.is_file() {
            return Err(MomoError::Other(format!(
                "Input file not found: {}",
                path.display()
            )));
        }
    }
    Ok(())
}

pub fn run(sms: Option<String>, csv: Option<String>) -> Result<()> {
    if sms.is_none() && csv.is_none() {
        return Err(MomoError::Other(
            "Nothing to ingest: pass --sms and/or --csv".to_string(),
        ));
    }
    let sms = sms.map(PathBuf::from);
    let csv = csv.map(PathBuf::from);
    check_inputs(&[sms.as_deref(), csv.as_deref()])?;

    let settings = load_settings();
    let conn = super::open_ledger(&settings)?;
    let classifier = Classifier::new(Registry::builtin(), settings.tz()?);

    // A full run starts from an empty dead-letter log and an empty ledger.
    let log_path = settings.log_path();
    let mut sink = FileSink::fresh(&log_path)?;

    println!("Clearing previous data from the database...");
    let cleared = clear_transactions(&conn)?;
    tracing::info!(cleared, "cleared ledger");

    println!("\nProcessing data sources...");
    if let Some(path) = sms {
        let result = ingest_sms(&conn, &path, &classifier, &mut sink)?;
        println!("Processed {} / {} records from XML.", result.imported, result.total);
    }
    if let Some(path) = csv {
        let result = ingest_export(&conn, &path, &classifier, &mut sink)?;
        println!("Processed {} records from CSV.", result.imported);
    }
    sink.flush()?;
    tracing::info!(path = %sink.path().display(), entries = sink.written(), "dead-letter log written");

    println!("\nDatabase population complete.");

    let unprocessed = count_entries(&log_path)?;
    if unprocessed > 0 {
        println!(
            "\n{} {unprocessed} messages could not be parsed. Check '{}' for details.",
            "WARNING:".yellow().bold(),
            log_path.display()
        );
    }
    Ok(())
}
