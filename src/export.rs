use std::sync::OnceLock;

use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{RecordType, TransactionRecord, TransactionStatus};
use crate::normalize::{clean_amount, clean_party, clean_phone, parse_export_timestamp};

/// One row of the provider's CSV export. Columns are taken at face value;
/// only `Message` is mined further.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "Reference", default)]
    pub reference: Option<String>,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Amount", default)]
    pub amount: Option<String>,
    #[serde(rename = "Phone", default)]
    pub phone: Option<String>,
    #[serde(rename = "Message", default)]
    pub message: String,
}

fn fee_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Fee: RWF (\d[\d,]*(?:\.\d+)?)").expect("fee marker compiles"))
}

fn balance_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Your new balance is RWF (\d[\d,]*(?:\.\d+)?)").expect("balance marker compiles")
    })
}

fn marker_value(re: &Regex, message: &str) -> Option<f64> {
    re.captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| clean_amount(Some(m.as_str())))
}

/// Fee embedded in an export message, zero when absent.
pub fn export_fee(message: &str) -> f64 {
    marker_value(fee_marker(), message).unwrap_or(0.0)
}

/// Balance after the transaction, when the message reports one.
pub fn export_balance(message: &str) -> Option<f64> {
    marker_value(balance_marker(), message)
}

/// Build a record from an export row. Fails only when the row's timestamp
/// cannot be read.
pub fn extract_export_row(row: &ExportRow, tz: &Tz) -> Result<TransactionRecord> {
    let timestamp = parse_export_timestamp(&row.timestamp, tz)?;
    Ok(TransactionRecord {
        transaction_id: row.reference.as_deref().and_then(clean_party),
        timestamp,
        record_type: RecordType::from_label(&row.kind),
        amount: clean_amount(row.amount.as_deref()),
        fee: export_fee(&row.message),
        recipient_name: None,
        recipient_phone: row.phone.as_deref().and_then(clean_phone),
        sender_name: None,
        sender_phone: None,
        new_balance: export_balance(&row.message),
        status: TransactionStatus::Completed,
        raw_message: row.message.clone(),
    })
}
