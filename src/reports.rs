use chrono::{DateTime, Months, NaiveDate};
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::Serialize;

use crate::error::{MomoError, Result};
use crate::models::{
    RecordType, StoredTransaction, TransactionKind, TransactionRecord, TransactionStatus, ALL_KINDS,
};

// ---------------------------------------------------------------------------
// Transaction listing
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct TransactionFilter {
    /// Exact stored type.
    pub record_type: Option<String>,
    /// Inclusive bounds on the local date of the timestamp.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Substring of recipient name, sender name or raw message.
    pub search: Option<String>,
}

fn build_where(filter: &TransactionFilter) -> (String, Vec<Value>) {
    let mut clauses = vec!["1=1".to_string()];
    let mut params: Vec<Value> = Vec::new();

    if let Some(t) = &filter.record_type {
        params.push(Value::Text(t.clone()));
        clauses.push(format!("type = ?{}", params.len()));
    }
    if let Some(from) = filter.from {
        params.push(Value::Text(from.format("%Y-%m-%d").to_string()));
        clauses.push(format!("substr(timestamp, 1, 10) >= ?{}", params.len()));
    }
    if let Some(to) = filter.to {
        params.push(Value::Text(to.format("%Y-%m-%d").to_string()));
        clauses.push(format!("substr(timestamp, 1, 10) <= ?{}", params.len()));
    }
    if let Some(search) = &filter.search {
        params.push(Value::Text(format!("%{search}%")));
        let n = params.len();
        clauses.push(format!(
            "(recipient_name LIKE ?{n} OR sender_name LIKE ?{n} OR raw_message LIKE ?{n})"
        ));
    }
    (clauses.join(" AND "), params)
}

type RawRow = (
    i64,
    Option<String>,
    String,
    String,
    f64,
    f64,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<f64>,
    String,
    String,
);

fn into_stored(row: RawRow) -> Result<StoredTransaction> {
    let (id, transaction_id, ts, kind, amount, fee, rn, rp, sn, sp, balance, status, raw) = row;
    let timestamp =
        DateTime::parse_from_rfc3339(&ts).map_err(|_| MomoError::MalformedTimestamp(ts.clone()))?;
    Ok(StoredTransaction {
        id,
        record: TransactionRecord {
            transaction_id,
            timestamp,
            record_type: RecordType::from_label(&kind),
            amount,
            fee,
            recipient_name: rn,
            recipient_phone: rp,
            sender_name: sn,
            sender_phone: sp,
            new_balance: balance,
            status: TransactionStatus::from_label(&status),
            raw_message: raw,
        },
    })
}

/// Matching transactions, newest first.
pub fn query_transactions(
    conn: &Connection,
    filter: &TransactionFilter,
) -> Result<Vec<StoredTransaction>> {
    let (clause, params) = build_where(filter);
    let sql = format!(
        "SELECT id, transaction_id, timestamp, type, amount, fee, recipient_name, recipient_phone, \
         sender_name, sender_phone, new_balance, status, raw_message \
         FROM transactions WHERE {clause} ORDER BY timestamp DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<RawRow> = stmt
        .query_map(rusqlite::params_from_iter(params), |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
                row.get(10)?,
                row.get(11)?,
                row.get(12)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(into_stored).collect()
}

// ---------------------------------------------------------------------------
// Summary by type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSummary {
    #[serde(rename = "type")]
    pub record_type: String,
    pub count: i64,
    pub total_amount: f64,
}

/// Count and total per type, ignoring OTP rows and non-positive amounts.
pub fn summary_by_type(conn: &Connection) -> Result<Vec<TypeSummary>> {
    let mut stmt = conn.prepare(
        "SELECT type, COUNT(*), SUM(amount) FROM transactions \
         WHERE amount > 0 AND type != ?1 \
         GROUP BY type ORDER BY type",
    )?;
    let rows = stmt
        .query_map([TransactionKind::Otp.key()], |row| {
            Ok(TypeSummary {
                record_type: row.get(0)?,
                count: row.get(1)?,
                total_amount: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Monthly totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotals {
    pub month: String,
    pub total_spent: f64,
    pub total_received: f64,
}

/// Spending vs. receipts per month over the 12 months leading up to `today`.
pub fn monthly_totals(conn: &Connection, today: NaiveDate) -> Result<Vec<MonthTotals>> {
    let cutoff = today
        .checked_sub_months(Months::new(12))
        .ok_or_else(|| MomoError::InvalidDate(today.to_string()))?;

    let incoming: Vec<&str> = ALL_KINDS
        .iter()
        .filter(|k| k.is_incoming())
        .map(|k| k.key())
        .collect();
    let placeholders: Vec<String> = (0..incoming.len()).map(|i| format!("?{}", i + 2)).collect();
    let in_list = placeholders.join(", ");

    let sql = format!(
        "SELECT substr(timestamp, 1, 7) AS month, \
         SUM(CASE WHEN amount > 0 AND type NOT IN ({in_list}) THEN amount ELSE 0 END), \
         SUM(CASE WHEN amount > 0 AND type IN ({in_list}) THEN amount ELSE 0 END) \
         FROM transactions WHERE substr(timestamp, 1, 10) >= ?1 \
         GROUP BY month ORDER BY month"
    );
    let mut params: Vec<Value> = vec![Value::Text(cutoff.format("%Y-%m-%d").to_string())];
    params.extend(incoming.iter().map(|k| Value::Text(k.to_string())));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), |row| {
            Ok(MonthTotals {
                month: row.get(0)?,
                total_spent: row.get(1)?,
                total_received: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Import history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub filename: String,
    pub source: String,
    pub import_date: String,
    pub row_count: i64,
    pub record_count: i64,
}

pub fn recent_imports(conn: &Connection, limit: usize) -> Result<Vec<ImportSummary>> {
    let mut stmt = conn.prepare(
        "SELECT filename, source, import_date, row_count, record_count FROM imports \
         ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(ImportSummary {
                filename: row.get(0)?,
                source: row.get(1)?,
                import_date: row.get(2)?,
                row_count: row.get(3)?,
                record_count: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db, insert_record};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn add(conn: &Connection, ts: &str, kind: &str, amount: f64, sender: Option<&str>, raw: &str) {
        let record = TransactionRecord {
            transaction_id: None,
            timestamp: DateTime::parse_from_rfc3339(ts).unwrap(),
            record_type: RecordType::from_label(kind),
            amount,
            fee: 0.0,
            recipient_name: None,
            recipient_phone: None,
            sender_name: sender.map(str::to_string),
            sender_phone: None,
            new_balance: None,
            status: TransactionStatus::Completed,
            raw_message: raw.to_string(),
        };
        insert_record(conn, &record).unwrap();
    }

    fn seed(conn: &Connection) {
        add(conn, "2024-05-10T09:00:00+02:00", "incoming_money", 5000.0, Some("John Doe"), "You have received 5,000 RWF");
        add(conn, "2024-05-11T23:30:00+02:00", "transfer_sent", 1000.0, None, "*165*S*1,000 RWF transferred to Jane");
        add(conn, "2024-06-01T08:00:00+02:00", "bank_deposit", 40000.0, Some("Bank"), "A bank deposit of 40,000 RWF");
        add(conn, "2024-06-02T08:00:00+02:00", "airtime_payment", 0.0, None, "Your payment of 0 RWF to Airtime");
        add(conn, "2024-06-03T08:00:00+02:00", "otp", 834921.0, None, "one-time password is :834921");
    }

    #[test]
    fn test_query_filters_by_type() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let rows = query_transactions(&conn, &TransactionFilter {
            record_type: Some("transfer_sent".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.amount, 1000.0);
    }

    #[test]
    fn test_query_date_range_is_inclusive_on_local_date() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let day = NaiveDate::from_ymd_opt(2024, 5, 11).unwrap();
        let rows = query_transactions(&conn, &TransactionFilter {
            from: Some(day),
            to: Some(day),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.record_type.as_str(), "transfer_sent");
    }

    #[test]
    fn test_query_search_and_ordering() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let rows = query_transactions(&conn, &TransactionFilter {
            search: Some("Bank".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(rows.len(), 1);

        let all = query_transactions(&conn, &TransactionFilter::default()).unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].record.timestamp >= w[1].record.timestamp));
    }

    #[test]
    fn test_summary_excludes_otp_and_zero_amounts() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let summary = summary_by_type(&conn).unwrap();
        let types: Vec<&str> = summary.iter().map(|s| s.record_type.as_str()).collect();
        assert_eq!(types, vec!["bank_deposit", "incoming_money", "transfer_sent"]);
        assert_eq!(summary[0].total_amount, 40000.0);
        assert_eq!(summary[0].count, 1);
    }

    #[test]
    fn test_monthly_totals_split_incoming_and_spent() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let today = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let months = monthly_totals(&conn, today).unwrap();
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2024-05");
        assert_eq!(months[0].total_received, 5000.0);
        assert_eq!(months[0].total_spent, 1000.0);
        assert_eq!(months[1].month, "2024-06");
        assert_eq!(months[1].total_received, 40000.0);
        // otp rows are not incoming kinds, so they count as spent here
        assert_eq!(months[1].total_spent, 834921.0);
    }

    #[test]
    fn test_monthly_totals_trailing_window() {
        let (_dir, conn) = test_db();
        seed(&conn);
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let months = monthly_totals(&conn, today).unwrap();
        let labels: Vec<&str> = months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, vec!["2024-06"]);
    }
}
