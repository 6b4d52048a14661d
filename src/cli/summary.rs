use chrono::Utc;
use colored::Colorize;
use comfy_table::{Cell, Table};
use serde::Serialize;

use crate::error::Result;
use crate::fmt::rwf;
use crate::reports::{monthly_totals, summary_by_type, MonthTotals, TypeSummary};
use crate::settings::load_settings;

#[derive(Serialize)]
struct Summary {
    by_type: Vec<TypeSummary>,
    by_month: Vec<MonthTotals>,
}

pub fn run(json: bool) -> Result<()> {
    let settings = load_settings();
    let conn = super::open_ledger(&settings)?;
    let today = Utc::now().with_timezone(&settings.tz()?).date_naive();

    let summary = Summary {
        by_type: summary_by_type(&conn)?,
        by_month: monthly_totals(&conn, today)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let mut by_type = Table::new();
    by_type.set_header(vec!["Type", "Count", "Total"]);
    for item in &summary.by_type {
        by_type.add_row(vec![
            Cell::new(&item.record_type),
            Cell::new(item.count),
            Cell::new(rwf(item.total_amount)),
        ]);
    }
    println!("By type\n{by_type}");

    let mut by_month = Table::new();
    by_month.set_header(vec!["Month", "Spent", "Received", "Net"]);
    for m in &summary.by_month {
        let net = m.total_received - m.total_spent;
        let net_cell = if net >= 0.0 {
            rwf(net).green()
        } else {
            rwf(net).red()
        };
        by_month.add_row(vec![
            Cell::new(&m.month),
            Cell::new(rwf(m.total_spent)),
            Cell::new(rwf(m.total_received)),
            Cell::new(net_cell),
        ]);
    }
    println!("\nLast 12 months\n{by_month}");
    Ok(())
}
