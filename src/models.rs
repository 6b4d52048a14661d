use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};

use crate::error::MomoError;

/// Message templates the registry knows about. The snake_case tag is the
/// `type` value stored with each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    IncomingMoney,
    PaymentCompleted,
    TransferSent,
    BankDeposit,
    CashpowerPayment,
    AirtimePayment,
    BundlePurchase,
    AgentWithdrawal,
    ThirdPartyDirectPayment,
    ReversalInitiated,
    ReversalCompleted,
    Otp,
}

pub const ALL_KINDS: &[TransactionKind] = &[
    TransactionKind::IncomingMoney,
    TransactionKind::PaymentCompleted,
    TransactionKind::TransferSent,
    TransactionKind::BankDeposit,
    TransactionKind::CashpowerPayment,
    TransactionKind::AirtimePayment,
    TransactionKind::BundlePurchase,
    TransactionKind::AgentWithdrawal,
    TransactionKind::ThirdPartyDirectPayment,
    TransactionKind::ReversalInitiated,
    TransactionKind::ReversalCompleted,
    TransactionKind::Otp,
];

impl TransactionKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::IncomingMoney => "incoming_money",
            Self::PaymentCompleted => "payment_completed",
            Self::TransferSent => "transfer_sent",
            Self::BankDeposit => "bank_deposit",
            Self::CashpowerPayment => "cashpower_payment",
            Self::AirtimePayment => "airtime_payment",
            Self::BundlePurchase => "bundle_purchase",
            Self::AgentWithdrawal => "agent_withdrawal",
            Self::ThirdPartyDirectPayment => "third_party_direct_payment",
            Self::ReversalInitiated => "reversal_initiated",
            Self::ReversalCompleted => "reversal_completed",
            Self::Otp => "otp",
        }
    }

    pub fn default_status(&self) -> TransactionStatus {
        match self {
            Self::ReversalInitiated | Self::ReversalCompleted => TransactionStatus::Reversed,
            _ => TransactionStatus::Completed,
        }
    }

    /// Money flowing into the account, as opposed to spending.
    pub fn is_incoming(&self) -> bool {
        matches!(self, Self::IncomingMoney | Self::BankDeposit)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TransactionKind {
    type Err = MomoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_KINDS
            .iter()
            .find(|k| k.key() == s)
            .copied()
            .ok_or_else(|| MomoError::UnknownType(s.to_string()))
    }
}

/// The stored `type` of a record. SMS records always carry a registry kind;
/// CSV export rows keep whatever label the export used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordType {
    Known(TransactionKind),
    Other(String),
}

impl RecordType {
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        match label.parse::<TransactionKind>() {
            Ok(kind) => Self::Known(kind),
            Err(_) => Self::Other(label.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(kind) => kind.key(),
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RecordType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Reversed,
    Unknown,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Reversed => "reversed",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "completed" => Self::Completed,
            "reversed" => Self::Reversed,
            _ => Self::Unknown,
        }
    }
}

/// A single money movement recovered from an SMS or an export row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub transaction_id: Option<String>,
    pub timestamp: DateTime<FixedOffset>,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub amount: f64,
    pub fee: f64,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub sender_name: Option<String>,
    pub sender_phone: Option<String>,
    pub new_balance: Option<f64>,
    pub status: TransactionStatus,
    pub raw_message: String,
}

/// A record as read back from the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredTransaction {
    pub id: i64,
    #[serde(flatten)]
    pub record: TransactionRecord,
}

/// One `<sms>` element from a backup archive, before classification.
#[derive(Debug, Clone)]
pub struct RawSms {
    pub body: String,
    pub date: String,
}
