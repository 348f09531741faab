use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name given to the synthetic card-payment bill and to every payment it books.
pub const CARD_PAYMENT_NAME: &str = "Credit Card Bill";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Annually,
    OneTime,
}

impl Frequency {
    /// Lenient parse of stored frequency text. Unknown text means one-time.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim().to_ascii_lowercase();
        // "biweekly" contains "weekly", so it has to be checked first.
        if s.contains("biweekly") {
            Frequency::Biweekly
        } else if s.contains("weekly") {
            Frequency::Weekly
        } else if s.contains("monthly") {
            Frequency::Monthly
        } else if s.contains("ann") {
            Frequency::Annually
        } else {
            Frequency::OneTime
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Weekly => "Weekly",
            Frequency::Biweekly => "Biweekly",
            Frequency::Monthly => "Monthly",
            Frequency::Annually => "Annually",
            Frequency::OneTime => "OneTime",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which series a bill lands on. Debit drains the checking-like balance,
/// Credit adds to the card balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Debit,
    Credit,
}

impl EntryKind {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("credit") {
            EntryKind::Credit
        } else {
            EntryKind::Debit
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Debit => "Debit",
            EntryKind::Credit => "Credit",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an entry is being expanded as a bill or as income. Income is
/// always positive regardless of its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRole {
    Bill,
    Income,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringEntry {
    pub name: String,
    /// Non-negative magnitude in minor units.
    pub amount: i64,
    pub frequency: Frequency,
    /// Raw anchor text: a weekday name, a `YYYY-MM-DD` date or a day of month,
    /// depending on `frequency`. Parsed leniently at expansion time.
    pub anchor: String,
    pub kind: EntryKind,
    /// Set only on the derived card-payment bill.
    #[serde(default)]
    pub synthetic: bool,
}

impl RecurringEntry {
    pub fn new(
        name: impl Into<String>,
        amount: i64,
        frequency: Frequency,
        anchor: impl Into<String>,
        kind: EntryKind,
    ) -> Self {
        Self {
            name: name.into(),
            amount,
            frequency,
            anchor: anchor.into(),
            kind,
            synthetic: false,
        }
    }

    pub fn income(
        name: impl Into<String>,
        amount: i64,
        frequency: Frequency,
        anchor: impl Into<String>,
    ) -> Self {
        Self::new(name, amount, frequency, anchor, EntryKind::Credit)
    }

    /// Sign applied to `amount` for each occurrence.
    pub fn sign(&self, role: EntryRole) -> i64 {
        match (role, self.kind) {
            (EntryRole::Income, _) => 1,
            (EntryRole::Bill, EntryKind::Credit) => 1,
            (EntryRole::Bill, EntryKind::Debit) => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaymentPolicy {
    #[default]
    PayInFull,
    PayPercentOfBalance,
    PayFixedAmount,
}

impl PaymentPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "full" | "in-full" | "payinfull" => Some(PaymentPolicy::PayInFull),
            "percent" | "percentage" | "paypercentofbalance" => {
                Some(PaymentPolicy::PayPercentOfBalance)
            }
            "fixed" | "amount" | "payfixedamount" => Some(PaymentPolicy::PayFixedAmount),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentPolicy::PayInFull => "full",
            PaymentPolicy::PayPercentOfBalance => "percent",
            PaymentPolicy::PayFixedAmount => "fixed",
        }
    }
}

impl fmt::Display for PaymentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value snapshot of the user's balances and card configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProjectionSettings {
    pub debit_start_balance: i64,
    pub credit_start_balance: i64,
    pub card_due_day: Option<u32>,
    pub card_payment_policy: PaymentPolicy,
    /// Percent in [0, 100] or a fixed amount, depending on the policy.
    pub card_payment_value: Option<i64>,
    /// Annual percentage, e.g. 19.99.
    pub card_apr: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub signed_amount: i64,
    pub source_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub balance: i64,
}

/// An occurrence as reported to callers: absolute amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledItem {
    pub date: NaiveDate,
    pub name: String,
    pub amount: i64,
}

impl From<&Occurrence> for ScheduledItem {
    fn from(occ: &Occurrence) -> Self {
        Self {
            date: occ.date,
            name: occ.source_name.clone(),
            amount: occ.signed_amount.abs(),
        }
    }
}

/// Historical transaction, as supplied by the import/storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub name: String,
    /// Signed; negative means money out.
    pub amount: Decimal,
}

impl Transaction {
    pub fn new(date: NaiveDate, name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            date,
            name: name.into(),
            amount,
        }
    }

    pub fn kind(&self) -> EntryKind {
        if self.amount < Decimal::ZERO {
            EntryKind::Debit
        } else {
            EntryKind::Credit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_parse_checks_biweekly_before_weekly() {
        assert_eq!(Frequency::parse("Biweekly"), Frequency::Biweekly);
        assert_eq!(Frequency::parse("weekly"), Frequency::Weekly);
        assert_eq!(Frequency::parse("Monthly"), Frequency::Monthly);
        assert_eq!(Frequency::parse("Annual"), Frequency::Annually);
        assert_eq!(Frequency::parse("Annually"), Frequency::Annually);
        assert_eq!(Frequency::parse("whenever"), Frequency::OneTime);
        assert_eq!(Frequency::parse(""), Frequency::OneTime);
    }

    #[test]
    fn kind_defaults_to_debit() {
        assert_eq!(EntryKind::parse(" Credit "), EntryKind::Credit);
        assert_eq!(EntryKind::parse("debit"), EntryKind::Debit);
        assert_eq!(EntryKind::parse("???"), EntryKind::Debit);
    }

    #[test]
    fn income_is_always_positive() {
        let mut e = RecurringEntry::income("Paycheck", 500, Frequency::Weekly, "friday");
        assert_eq!(e.sign(EntryRole::Income), 1);
        e.kind = EntryKind::Debit;
        assert_eq!(e.sign(EntryRole::Income), 1);
        assert_eq!(e.sign(EntryRole::Bill), -1);
    }
}
