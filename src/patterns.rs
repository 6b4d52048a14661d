use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{MomoError, Result};
use crate::models::TransactionKind;

// Named groups used across templates:
//   amount  - principal amount
//   name    - counterparty name
//   phone   - counterparty phone (may include masking asterisks)
//   fee     - fee charged
//   balance - account balance after the transaction
//
// Entries are tried top to bottom and the first hit wins, so a template that
// is a looser version of another must come after it.
const BUILTIN_PATTERNS: &[(TransactionKind, &str)] = &[
    (
        TransactionKind::IncomingMoney,
        r"You have received (?P<amount>[\d,.]+) RWF from (?P<name>.*?) \((?P<phone>\*+\d+|.*?)\) on your mobile money account at .*?[.;]\s*Your new balance:\s*(?P<balance>[\d,.]+) RWF",
    ),
    (
        TransactionKind::PaymentCompleted,
        r"TxId: \d+\. Your payment of (?P<amount>[\d,.]+) RWF to (?P<name>.*?) \d+ has been completed at .*?[.;]\s*Your new balance: (?P<balance>[\d,.]+) RWF",
    ),
    (
        TransactionKind::TransferSent,
        r"\*165\*S\*(?P<amount>[\d,.]+) RWF transferred to (?P<name>.*?)(?:\s*\((?P<phone>.*?)\))? from .*?\. Fee was: (?P<fee>[\d,.]+) RWF\. New balance: (?P<balance>[\d,.]+) RWF",
    ),
    (
        TransactionKind::BankDeposit,
        r"A bank deposit of (?P<amount>[\d,.]+) RWF has been added to your mobile money account at .*?[.;]\s*Your NEW BALANCE\s*:(?P<balance>[\d,.]+) RWF",
    ),
    (
        TransactionKind::CashpowerPayment,
        r"Your payment of (?P<amount>[\d,.]+) RWF to MTN Cash Power.*?Fee was (?P<fee>[\d,.]+) RWF\. Your new balance: (?P<balance>[\d,.]+) RWF",
    ),
    (
        TransactionKind::AirtimePayment,
        r"Your payment of (?P<amount>[\d,.]+) RWF to Airtime with token.*?Fee was (?P<fee>[\d,.]+) RWF\. Your new balance: (?P<balance>[\d,.]+) RWF",
    ),
    (
        TransactionKind::BundlePurchase,
        r"Your payment of (?P<amount>[\d,.]+) RWF to Bundles and Packs.*?Fee was (?P<fee>[\d,.]+) RWF\. Your new balance: (?P<balance>[\d,.]+) RWF",
    ),
    (
        TransactionKind::AgentWithdrawal,
        r"You .*? have via agent: (?P<name>.*?) \((?P<phone>.*?)\), withdrawn (?P<amount>[\d,.]+) RWF.*?Your new balance: (?P<balance>[\d,.]+) RWF\. Fee paid: (?P<fee>[\d,.]+) RWF",
    ),
    (
        TransactionKind::ThirdPartyDirectPayment,
        r"Y'ello,A transaction of (?P<amount>[\d,.]+) RWF by (?P<name>.*?) on your MOMO account was successfully completed at .*?[.;]\s*Your new balance:\s*(?P<balance>[\d,.]+) RWF\. Fee was (?P<fee>[\d,.]+) RWF",
    ),
    (
        TransactionKind::ReversalInitiated,
        r"A reversal has been initiated for your transaction to (?P<name>.*?) \((?P<phone>.*?)\) with (?P<amount>[\d,.]+) RWF",
    ),
    (
        TransactionKind::ReversalCompleted,
        r"Your transaction to (?P<name>.*?) \((?P<phone>.*?)\) with (?P<amount>[\d,.]+) RWF has been reversed at .*?[.;]\s*Your new balance is (?P<balance>[\d,.]+) RWF",
    ),
    (TransactionKind::Otp, r"one-time password is :(?P<code>\d+)"),
];

pub struct PatternEntry {
    pub kind: TransactionKind,
    pub regex: Regex,
}

impl PatternEntry {
    #[allow(dead_code)]
    pub fn new(kind: TransactionKind, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| MomoError::Other(format!("bad pattern for {kind}: {e}")))?;
        Ok(Self { kind, regex })
    }
}

/// Ordered list of message templates. Never keyed by kind: two entries may
/// match the same text and registration order decides.
pub struct Registry {
    entries: Vec<PatternEntry>,
}

impl Registry {
    pub fn new(entries: Vec<PatternEntry>) -> Self {
        Self { entries }
    }

    /// The templates the provider is known to send, compiled once.
    pub fn builtin() -> &'static Registry {
        static BUILTIN: OnceLock<Registry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            let entries = BUILTIN_PATTERNS
                .iter()
                .map(|(kind, pattern)| PatternEntry {
                    kind: *kind,
                    regex: Regex::new(pattern).expect("built-in pattern compiles"),
                })
                .collect();
            Registry::new(entries)
        })
    }

    #[allow(dead_code)]
    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    /// First entry, in registration order, whose pattern occurs in `body`.
    pub fn first_match<'t>(&self, body: &'t str) -> Option<(TransactionKind, Captures<'t>)> {
        self.entries
            .iter()
            .find_map(|entry| entry.regex.captures(body).map(|caps| (entry.kind, caps)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_kind_once_in_order() {
        let kinds: Vec<_> = Registry::builtin().entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, crate::models::ALL_KINDS.to_vec());
    }

    #[test]
    fn test_otp_is_registered_last() {
        let last = Registry::builtin().entries().last().map(|e| e.kind);
        assert_eq!(last, Some(TransactionKind::Otp));
    }

    #[test]
    fn test_first_registered_entry_wins_overlap() {
        let registry = Registry::new(vec![
            PatternEntry::new(TransactionKind::BankDeposit, r"deposit of (?P<amount>\d+)").unwrap(),
            PatternEntry::new(TransactionKind::IncomingMoney, r"(?P<amount>\d+) RWF").unwrap(),
        ]);
        let (kind, _) = registry.first_match("A deposit of 500 RWF").unwrap();
        assert_eq!(kind, TransactionKind::BankDeposit);

        let reversed = Registry::new(vec![
            PatternEntry::new(TransactionKind::IncomingMoney, r"(?P<amount>\d+) RWF").unwrap(),
            PatternEntry::new(TransactionKind::BankDeposit, r"deposit of (?P<amount>\d+)").unwrap(),
        ]);
        let (kind, _) = reversed.first_match("A deposit of 500 RWF").unwrap();
        assert_eq!(kind, TransactionKind::IncomingMoney);
    }

    #[test]
    fn test_no_match_returns_none() {
        assert!(Registry::builtin().first_match("random unrelated text").is_none());
    }

    #[test]
    fn test_invalid_custom_pattern_is_an_error() {
        assert!(PatternEntry::new(TransactionKind::Otp, r"(unclosed").is_err());
    }

    #[test]
    fn test_transfer_phone_is_optional() {
        let with_phone = "*165*S*10,000 RWF transferred to Samuel Carter (250791666666) from 36521838 at 2024-05-11 20:34:47 . Fee was: 100 RWF. New balance: 28,300 RWF.";
        let (kind, caps) = Registry::builtin().first_match(with_phone).unwrap();
        assert_eq!(kind, TransactionKind::TransferSent);
        assert_eq!(caps.name("phone").map(|m| m.as_str()), Some("250791666666"));

        let without = "*165*S*1,000 RWF transferred to Jane Smith from 36521838 at 2024-05-11 20:34:47 . Fee was: 20 RWF. New balance: 27,280 RWF.";
        let (kind, caps) = Registry::builtin().first_match(without).unwrap();
        assert_eq!(kind, TransactionKind::TransferSent);
        assert!(caps.name("phone").is_none());
    }
}
