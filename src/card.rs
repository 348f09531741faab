//! Credit-card payment model.
//!
//! The card payment is modeled as a synthetic monthly debit bill on the
//! configured due day. Its real amount is only known while the projector
//! replays the card balance day by day, so this module exposes both the
//! placeholder entry and the per-balance payment rule.

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::{
    CARD_PAYMENT_NAME, EntryKind, EntryRole, Frequency, PaymentPolicy, ProjectionSettings,
    RecurringEntry, ScheduledItem,
};
use crate::error::{ForecastError, check_window};
use crate::recurrence::{expand, occurrence_dates, window_end};

/// A payment policy with its required value resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRule {
    InFull,
    Percent(i64),
    Fixed(i64),
}

impl PaymentRule {
    pub fn resolve(settings: &ProjectionSettings) -> Result<Self, ForecastError> {
        let policy = settings.card_payment_policy;
        match (policy, settings.card_payment_value) {
            (PaymentPolicy::PayInFull, _) => Ok(PaymentRule::InFull),
            (PaymentPolicy::PayPercentOfBalance, Some(pct)) => Ok(PaymentRule::Percent(pct)),
            (PaymentPolicy::PayFixedAmount, Some(amount)) => Ok(PaymentRule::Fixed(amount)),
            (_, None) => Err(ForecastError::PaymentUndetermined { policy }),
        }
    }

    /// Payment owed against `balance`, never more than what is actually due.
    pub fn amount_for(self, balance: i64) -> i64 {
        let due = balance.max(0);
        let raw = match self {
            PaymentRule::InFull => due,
            PaymentRule::Percent(pct) => Decimal::from(balance)
                .checked_mul(Decimal::from(pct))
                .map(|v| round_to_i64(v / Decimal::ONE_HUNDRED))
                .unwrap_or(due),
            PaymentRule::Fixed(amount) => amount,
        };
        raw.max(0).min(due)
    }
}

pub fn payment_amount_for_balance(
    settings: &ProjectionSettings,
    balance_at_due: i64,
) -> Result<i64, ForecastError> {
    Ok(PaymentRule::resolve(settings)?.amount_for(balance_at_due))
}

/// Synthetic monthly bill for the card payment, or `None` when no due day is
/// configured. The amount is a placeholder computed from the starting credit
/// balance; the projector books the real amount per due date.
pub fn derive_payment_entry(
    settings: &ProjectionSettings,
) -> Result<Option<RecurringEntry>, ForecastError> {
    let Some(due_day) = settings.card_due_day else {
        return Ok(None);
    };
    let placeholder = payment_amount_for_balance(settings, settings.credit_start_balance)?;
    debug!("card payment entry on day {due_day}, placeholder {placeholder}");

    Ok(Some(RecurringEntry {
        name: CARD_PAYMENT_NAME.to_string(),
        amount: placeholder,
        frequency: Frequency::Monthly,
        anchor: due_day.to_string(),
        kind: EntryKind::Debit,
        synthetic: true,
    }))
}

/// One month of interest on `remaining` at `apr` percent per year.
pub fn monthly_interest(apr: Decimal, remaining: i64) -> i64 {
    if apr <= Decimal::ZERO || remaining <= 0 {
        return 0;
    }
    Decimal::from(remaining)
        .checked_mul(apr)
        .map(|v| round_to_i64(v / Decimal::from(1200)))
        .unwrap_or(i64::MAX)
}

/// Half-to-even rounding into minor units, saturating at the i64 range.
fn round_to_i64(value: Decimal) -> i64 {
    value.round().to_i64().unwrap_or(if value.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Card due dates inside the window, independent of the payment policy.
pub fn due_dates(settings: &ProjectionSettings, start: NaiveDate, horizon_days: u32) -> Vec<NaiveDate> {
    match settings.card_due_day {
        Some(day) => occurrence_dates(
            Frequency::Monthly,
            &day.to_string(),
            start,
            window_end(start, horizon_days),
        ),
        None => Vec::new(),
    }
}

/// Charges accumulated on the card between two consecutive due dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementWindow {
    pub start: NaiveDate,
    /// The due date closing this window (exclusive).
    pub end: NaiveDate,
    pub charges_total: i64,
    /// Carried-in starting balance; only the first window has one.
    pub balance_included: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatementSchedule {
    pub pay_dates: Vec<NaiveDate>,
    pub windows: Vec<StatementWindow>,
    pub charges: Vec<ScheduledItem>,
}

/// Groups credit-kind bill occurrences into statement windows ending on each
/// due date. A charge that lands on a due date is billed the next day.
pub fn statement_windows(
    bills: &[RecurringEntry],
    settings: &ProjectionSettings,
    start: NaiveDate,
    horizon_days: u32,
) -> Result<StatementSchedule, ForecastError> {
    check_window(start, horizon_days)?;
    let pay_dates = due_dates(settings, start, horizon_days);
    if pay_dates.is_empty() {
        return Ok(StatementSchedule::default());
    }

    let mut charges = Vec::new();
    for bill in bills.iter().filter(|b| b.kind == EntryKind::Credit && !b.synthetic) {
        for occ in expand(bill, EntryRole::Bill, start, horizon_days) {
            let mut item = ScheduledItem::from(&occ);
            if pay_dates.binary_search(&item.date).is_ok() {
                item.date = item.date.succ_opt().unwrap_or(item.date);
            }
            charges.push(item);
        }
    }

    let mut windows = Vec::with_capacity(pay_dates.len());
    let mut window_start = start;
    for (i, pay_date) in pay_dates.iter().copied().enumerate() {
        let charges_total: i64 = charges
            .iter()
            .filter(|c| c.date >= window_start && c.date < pay_date)
            .fold(0_i64, |acc, c| acc.saturating_add(c.amount));
        let balance_included = if i == 0 {
            settings.credit_start_balance.max(0)
        } else {
            0
        };
        windows.push(StatementWindow {
            start: window_start,
            end: pay_date,
            charges_total,
            balance_included,
            total: charges_total.saturating_add(balance_included),
        });
        window_start = pay_date;
    }

    Ok(StatementSchedule {
        pay_dates,
        windows,
        charges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn settings(policy: PaymentPolicy, value: Option<i64>) -> ProjectionSettings {
        ProjectionSettings {
            credit_start_balance: 200,
            card_due_day: Some(15),
            card_payment_policy: policy,
            card_payment_value: value,
            ..Default::default()
        }
    }

    #[test]
    fn pay_in_full_never_goes_negative() {
        let s = settings(PaymentPolicy::PayInFull, None);
        assert_eq!(payment_amount_for_balance(&s, 250).unwrap(), 250);
        assert_eq!(payment_amount_for_balance(&s, -40).unwrap(), 0);
    }

    #[test]
    fn percent_rounds_half_to_even() {
        let s = settings(PaymentPolicy::PayPercentOfBalance, Some(10));
        assert_eq!(payment_amount_for_balance(&s, 1000).unwrap(), 100);
        // 25 * 10% = 2.5 -> 2
        assert_eq!(payment_amount_for_balance(&s, 25).unwrap(), 2);
        // 35 * 10% = 3.5 -> 4
        assert_eq!(payment_amount_for_balance(&s, 35).unwrap(), 4);
    }

    #[test]
    fn fixed_is_capped_at_balance_due() {
        let s = settings(PaymentPolicy::PayFixedAmount, Some(500));
        assert_eq!(payment_amount_for_balance(&s, 1200).unwrap(), 500);
        assert_eq!(payment_amount_for_balance(&s, 120).unwrap(), 120);
        assert_eq!(payment_amount_for_balance(&s, 0).unwrap(), 0);
    }

    #[test]
    fn payment_never_exceeds_balance_due() {
        let rules = [
            PaymentRule::InFull,
            PaymentRule::Percent(150),
            PaymentRule::Percent(-5),
            PaymentRule::Fixed(10_000),
            PaymentRule::Fixed(-3),
        ];
        for rule in rules {
            for balance in [-500, -1, 0, 1, 37, 999, 10_000] {
                let paid = rule.amount_for(balance);
                assert!(paid >= 0);
                assert!(paid <= balance.max(0), "{rule:?} paid {paid} on {balance}");
            }
        }
    }

    #[test]
    fn missing_value_is_undetermined_not_zero() {
        let s = settings(PaymentPolicy::PayFixedAmount, None);
        assert_eq!(
            payment_amount_for_balance(&s, 100),
            Err(ForecastError::PaymentUndetermined {
                policy: PaymentPolicy::PayFixedAmount
            })
        );
        assert!(derive_payment_entry(&s).is_err());
    }

    #[test]
    fn derived_entry_is_synthetic_monthly_debit() {
        let s = settings(PaymentPolicy::PayInFull, None);
        let entry = derive_payment_entry(&s).unwrap().unwrap();
        assert_eq!(entry.name, CARD_PAYMENT_NAME);
        assert_eq!(entry.frequency, Frequency::Monthly);
        assert_eq!(entry.anchor, "15");
        assert_eq!(entry.kind, EntryKind::Debit);
        assert_eq!(entry.amount, 200);
        assert!(entry.synthetic);

        let none = ProjectionSettings::default();
        assert_eq!(derive_payment_entry(&none).unwrap(), None);
    }

    #[test]
    fn monthly_interest_uses_apr_over_twelve() {
        let apr = Decimal::new(1200, 2); // 12.00%
        assert_eq!(monthly_interest(apr, 1000), 10);
        assert_eq!(monthly_interest(apr, 0), 0);
        assert_eq!(monthly_interest(Decimal::ZERO, 1000), 0);
        assert_eq!(monthly_interest(Decimal::new(1999, 2), 500), 8);
    }

    #[test]
    fn statement_windows_split_on_due_dates() {
        let s = ProjectionSettings {
            credit_start_balance: 300,
            card_due_day: Some(10),
            ..Default::default()
        };
        let bills = vec![
            RecurringEntry::new("Gym", 40, Frequency::Monthly, "5", EntryKind::Credit),
            RecurringEntry::new("Streaming", 15, Frequency::Monthly, "10", EntryKind::Credit),
            RecurringEntry::new("Rent", 900, Frequency::Monthly, "1", EntryKind::Debit),
        ];
        let sched = statement_windows(&bills, &s, d(2024, 1, 1), 45).unwrap();

        assert_eq!(sched.pay_dates, vec![d(2024, 1, 10), d(2024, 2, 10)]);
        assert_eq!(sched.windows.len(), 2);

        let first = &sched.windows[0];
        assert_eq!(first.start, d(2024, 1, 1));
        assert_eq!(first.charges_total, 40);
        assert_eq!(first.balance_included, 300);
        assert_eq!(first.total, 340);

        // Streaming on Jan 10 is pushed to Jan 11 and lands in the second window.
        let second = &sched.windows[1];
        assert_eq!(second.start, d(2024, 1, 10));
        assert_eq!(second.charges_total, 15 + 40);
        assert_eq!(second.balance_included, 0);
    }

    #[test]
    fn no_due_day_means_no_statements() {
        let sched = statement_windows(&[], &ProjectionSettings::default(), d(2024, 1, 1), 30).unwrap();
        assert!(sched.pay_dates.is_empty());
        assert!(sched.windows.is_empty());
    }

    #[test]
    fn statement_horizon_is_bounded() {
        let s = settings(PaymentPolicy::PayInFull, None);
        for days in [0, 1826] {
            assert!(matches!(
                statement_windows(&[], &s, d(2024, 1, 1), days),
                Err(ForecastError::HorizonOutOfRange { .. })
            ));
        }
        assert_eq!(statement_windows(&[], &s, d(2024, 1, 1), 1825).unwrap().windows.len(), 60);
    }

    #[test]
    fn extreme_rates_saturate_instead_of_overflowing() {
        assert_eq!(PaymentRule::Percent(i64::MAX).amount_for(i64::MAX), i64::MAX);
        assert_eq!(PaymentRule::Percent(50).amount_for(i64::MAX), i64::MAX / 2 + 1);
        assert_eq!(monthly_interest(Decimal::MAX, 2), i64::MAX);
        assert_eq!(monthly_interest(Decimal::new(1_000_000, 0), i64::MAX), i64::MAX);
    }
}
