use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;
use crate::models::TransactionRecord;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    transaction_id TEXT,
    timestamp TEXT NOT NULL,
    type TEXT NOT NULL,
    amount REAL NOT NULL DEFAULT 0,
    fee REAL NOT NULL DEFAULT 0,
    recipient_name TEXT,
    recipient_phone TEXT,
    sender_name TEXT,
    sender_phone TEXT,
    new_balance REAL,
    status TEXT NOT NULL DEFAULT 'unknown',
    raw_message TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_type ON transactions (type);
CREATE INDEX IF NOT EXISTS idx_timestamp ON transactions (timestamp);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    source TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    row_count INTEGER,
    record_count INTEGER,
    checksum TEXT
);
";

pub const DB_FILE: &str = "momo_transactions.db";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Remove every stored transaction ahead of a full reload.
pub fn clear_transactions(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM transactions", [])?)
}

/// Timestamps are stored as RFC 3339 text. Every record is normalized into the
/// configured zone before it gets here, so string order is time order and the
/// first 10/7 chars are the local date/month.
pub fn insert_record(conn: &Connection, record: &TransactionRecord) -> Result<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO transactions (
            transaction_id, timestamp, type, amount, fee, recipient_name,
            recipient_phone, sender_name, sender_phone, new_balance, status, raw_message
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?;
    stmt.execute(rusqlite::params![
        record.transaction_id,
        record.timestamp.to_rfc3339(),
        record.record_type.as_str(),
        record.amount,
        record.fee,
        record.recipient_name,
        record.recipient_phone,
        record.sender_name,
        record.sender_phone,
        record.new_balance,
        record.status.as_str(),
        record.raw_message,
    ])?;
    Ok(conn.last_insert_rowid())
}

pub struct ImportEntry<'a> {
    pub filename: &'a str,
    pub source: &'a str,
    pub row_count: usize,
    pub record_count: usize,
    pub checksum: &'a str,
}

pub fn record_import(conn: &Connection, entry: &ImportEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO imports (filename, source, row_count, record_count, checksum) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            entry.filename,
            entry.source,
            entry.row_count as i64,
            entry.record_count as i64,
            entry.checksum,
        ],
    )?;
    Ok(())
}
