use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::reports::recent_imports;
use crate::settings::load_settings;
use crate::sink::count_entries;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();
    let log_path = settings.log_path();

    println!("Data dir:     {}", settings.data_path().display());
    println!("Database:     {}", db_path.display());
    println!("Time zone:    {}", settings.timezone);
    println!("Dead letters: {} ({} entries)", log_path.display(), count_entries(&log_path)?);

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        init_db(&conn)?;
        let transactions: i64 =
            conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
        println!();
        println!("Transactions: {transactions}");
        for import in recent_imports(&conn, 5)? {
            println!(
                "  {} [{}] {}: {} of {} rows",
                import.import_date, import.source, import.filename, import.record_count, import.row_count
            );
        }
    } else {
        println!();
        println!("Database not found. Run `momo init` to set up.");
    }

    Ok(())
}
