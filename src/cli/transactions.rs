use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::{rwf, timestamp_text};
use crate::models::TransactionKind;
use crate::normalize::parse_query_date;
use crate::reports::{query_transactions, TransactionFilter};
use crate::settings::load_settings;

pub fn run(
    record_type: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    if let Some(t) = &record_type {
        if t.parse::<TransactionKind>().is_err() {
            tracing::info!(record_type = %t, "not a message template type, matching export labels only");
        }
    }
    let filter = TransactionFilter {
        record_type,
        from: from_date.as_deref().map(parse_query_date).transpose()?,
        to: to_date.as_deref().map(parse_query_date).transpose()?,
        search,
    };

    let conn = super::open_ledger(&load_settings())?;
    let rows = query_transactions(&conn, &filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Type", "Amount", "Fee", "Counterparty", "Balance", "Status"]);
    for row in &rows {
        let r = &row.record;
        let counterparty = r
            .recipient_name
            .as_deref()
            .or(r.sender_name.as_deref())
            .or(r.recipient_phone.as_deref())
            .unwrap_or("");
        table.add_row(vec![
            Cell::new(row.id),
            Cell::new(timestamp_text(&r.timestamp)),
            Cell::new(r.record_type.as_str()),
            Cell::new(rwf(r.amount)),
            Cell::new(rwf(r.fee)),
            Cell::new(counterparty),
            Cell::new(r.new_balance.map(rwf).unwrap_or_default()),
            Cell::new(r.status.as_str()),
        ]);
    }
    println!("Transactions ({})\n{table}", rows.len());
    Ok(())
}
