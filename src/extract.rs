use chrono::{DateTime, FixedOffset};
use regex::Captures;

use crate::models::{RecordType, TransactionKind, TransactionRecord};
use crate::normalize::{amount_is_degraded, clean_amount, clean_party, clean_phone};

/// Counterparty and money fields pulled from one matched template.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Fields {
    pub amount: f64,
    pub fee: f64,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub sender_name: Option<String>,
    pub sender_phone: Option<String>,
    pub new_balance: Option<f64>,
}

fn text<'t>(caps: &Captures<'t>, group: &str) -> Option<&'t str> {
    caps.name(group).map(|m| m.as_str())
}

fn amount(caps: &Captures, group: &str) -> f64 {
    let raw = text(caps, group);
    if amount_is_degraded(raw) {
        tracing::trace!(group, raw = ?raw, "amount text has no usable digits, using 0");
    }
    clean_amount(raw)
}

fn balance(caps: &Captures) -> Option<f64> {
    Some(amount(caps, "balance"))
}

fn name(caps: &Captures) -> Option<String> {
    text(caps, "name").and_then(clean_party)
}

fn phone(caps: &Captures) -> Option<String> {
    text(caps, "phone").and_then(clean_phone)
}

// ---------------------------------------------------------------------------
// Per-kind extractors
// ---------------------------------------------------------------------------

fn incoming_money(caps: &Captures) -> Fields {
    Fields {
        amount: amount(caps, "amount"),
        sender_name: name(caps),
        sender_phone: phone(caps),
        new_balance: balance(caps),
        ..Fields::default()
    }
}

fn payment_completed(caps: &Captures) -> Fields {
    Fields {
        amount: amount(caps, "amount"),
        recipient_name: name(caps),
        new_balance: balance(caps),
        ..Fields::default()
    }
}

fn transfer_sent(caps: &Captures) -> Fields {
    Fields {
        amount: amount(caps, "amount"),
        fee: amount(caps, "fee"),
        recipient_name: name(caps),
        recipient_phone: phone(caps),
        new_balance: balance(caps),
        ..Fields::default()
    }
}

fn bank_deposit(caps: &Captures) -> Fields {
    Fields {
        amount: amount(caps, "amount"),
        sender_name: Some("Bank".to_string()),
        new_balance: balance(caps),
        ..Fields::default()
    }
}

/// Cash power, airtime and bundles all report only amount, fee and balance.
fn utility_payment(caps: &Captures) -> Fields {
    Fields {
        amount: amount(caps, "amount"),
        fee: amount(caps, "fee"),
        new_balance: balance(caps),
        ..Fields::default()
    }
}

fn agent_withdrawal(caps: &Captures) -> Fields {
    let agent = name(caps).unwrap_or_default();
    Fields {
        amount: amount(caps, "amount"),
        fee: amount(caps, "fee"),
        recipient_name: Some(format!("Agent: {agent}")),
        recipient_phone: phone(caps),
        new_balance: balance(caps),
        ..Fields::default()
    }
}

fn third_party_direct_payment(caps: &Captures) -> Fields {
    Fields {
        amount: amount(caps, "amount"),
        fee: amount(caps, "fee"),
        recipient_name: name(caps),
        new_balance: balance(caps),
        ..Fields::default()
    }
}

fn reversal_initiated(caps: &Captures) -> Fields {
    Fields {
        amount: amount(caps, "amount"),
        recipient_name: name(caps),
        recipient_phone: phone(caps),
        ..Fields::default()
    }
}

fn reversal_completed(caps: &Captures) -> Fields {
    Fields {
        amount: amount(caps, "amount"),
        recipient_name: name(caps),
        recipient_phone: phone(caps),
        new_balance: balance(caps),
        ..Fields::default()
    }
}

/// Map a matched template's captures onto typed fields. `None` for kinds that
/// never become records (OTP notifications).
pub fn extract_fields(kind: TransactionKind, caps: &Captures) -> Option<Fields> {
    let fields = match kind {
        TransactionKind::IncomingMoney => incoming_money(caps),
        TransactionKind::PaymentCompleted => payment_completed(caps),
        TransactionKind::TransferSent => transfer_sent(caps),
        TransactionKind::BankDeposit => bank_deposit(caps),
        TransactionKind::CashpowerPayment
        | TransactionKind::AirtimePayment
        | TransactionKind::BundlePurchase => utility_payment(caps),
        TransactionKind::AgentWithdrawal => agent_withdrawal(caps),
        TransactionKind::ThirdPartyDirectPayment => third_party_direct_payment(caps),
        TransactionKind::ReversalInitiated => reversal_initiated(caps),
        TransactionKind::ReversalCompleted => reversal_completed(caps),
        TransactionKind::Otp => return None,
    };
    Some(fields)
}

pub fn build_record(
    kind: TransactionKind,
    fields: Fields,
    timestamp: DateTime<FixedOffset>,
    raw_message: &str,
) -> TransactionRecord {
    TransactionRecord {
        transaction_id: None,
        timestamp,
        record_type: RecordType::Known(kind),
        amount: fields.amount,
        fee: fields.fee,
        recipient_name: fields.recipient_name,
        recipient_phone: fields.recipient_phone,
        sender_name: fields.sender_name,
        sender_phone: fields.sender_phone,
        new_balance: fields.new_balance,
        status: kind.default_status(),
        raw_message: raw_message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::Registry;

    fn fields_for(body: &str) -> (TransactionKind, Option<Fields>) {
        let (kind, caps) = Registry::builtin().first_match(body).unwrap();
        (kind, extract_fields(kind, &caps))
    }

    #[test]
    fn test_agent_withdrawal_labels_agent() {
        let body = "You Abebe Chala CHEBUDIE (*********036) have via agent: Agent Sophia (250790777777), withdrawn 20,000 RWF from your mobile money account: 36521838 at 2024-05-26 02:10:27 and you can now collect your money in cash. Your new balance: 6,400 RWF. Fee paid: 350 RWF. Message from agent: 1,Thank you for using MTN MobileMoney.";
        let (kind, fields) = fields_for(body);
        assert_eq!(kind, TransactionKind::AgentWithdrawal);
        let f = fields.unwrap();
        assert_eq!(f.recipient_name.as_deref(), Some("Agent: Agent Sophia"));
        assert_eq!(f.recipient_phone.as_deref(), Some("250790777777"));
        assert_eq!(f.amount, 20000.0);
        assert_eq!(f.new_balance, Some(6400.0));
        assert_eq!(f.fee, 350.0);
    }

    #[test]
    fn test_bank_deposit_uses_fixed_sender() {
        let body = "*113*R*A bank deposit of 40,000 RWF has been added to your mobile money account at 2024-05-11 18:43:49. Your NEW BALANCE :40,400 RWF. Cash Deposit::CASH::::0::250795963036.";
        let (kind, fields) = fields_for(body);
        assert_eq!(kind, TransactionKind::BankDeposit);
        let f = fields.unwrap();
        assert_eq!(f.sender_name.as_deref(), Some("Bank"));
        assert_eq!(f.amount, 40000.0);
        assert_eq!(f.new_balance, Some(40400.0));
        assert_eq!(f.fee, 0.0);
    }

    #[test]
    fn test_utility_payments_carry_fee_and_balance() {
        let cases = [
            ("Your payment of 3,000 RWF to MTN Cash Power with token 12345 has been completed at 2024-05-12. Fee was 0 RWF. Your new balance: 7,000 RWF.", TransactionKind::CashpowerPayment),
            ("Your payment of 500 RWF to Airtime with token  has been completed at 2024-05-12. Fee was 0 RWF. Your new balance: 6,500 RWF.", TransactionKind::AirtimePayment),
            ("Your payment of 2,000 RWF to Bundles and Packs with token  has been completed at 2024-05-12. Fee was 10 RWF. Your new balance: 4,490 RWF.", TransactionKind::BundlePurchase),
        ];
        for (body, expected) in cases {
            let (kind, fields) = fields_for(body);
            assert_eq!(kind, expected, "{body}");
            let f = fields.unwrap();
            assert!(f.amount > 0.0);
            assert!(f.new_balance.is_some());
            assert!(f.recipient_name.is_none());
        }
    }

    #[test]
    fn test_reversal_initiated_has_no_balance() {
        let body = "A reversal has been initiated for your transaction to Linda Green (250788999999) with 4,000 RWF.";
        let (kind, fields) = fields_for(body);
        assert_eq!(kind, TransactionKind::ReversalInitiated);
        let f = fields.unwrap();
        assert_eq!(f.recipient_name.as_deref(), Some("Linda Green"));
        assert_eq!(f.recipient_phone.as_deref(), Some("250788999999"));
        assert_eq!(f.new_balance, None);
    }

    #[test]
    fn test_otp_yields_no_fields() {
        let (kind, fields) = fields_for("Your one-time password is :834921");
        assert_eq!(kind, TransactionKind::Otp);
        assert!(fields.is_none());
    }
}
