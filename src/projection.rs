//! Daily balance projector.
//!
//! Expands every bill and income into per-day deltas (one slot per day
//! offset), replays the card balance left to right to book payments and
//! interest on each due date, then folds the deltas into two contiguous daily
//! balance series.

use chrono::{Days, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::card::{PaymentRule, derive_payment_entry, monthly_interest};
use crate::domain::{
    BalancePoint, CARD_PAYMENT_NAME, EntryKind, EntryRole, ProjectionSettings, RecurringEntry,
    ScheduledItem,
};
use crate::error::{ForecastError, check_window};
use crate::recurrence::expand;

/// How the credit card took part in a projection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardModel {
    /// No due day configured.
    NotConfigured,
    Modeled,
    /// The policy lacks its value, so no payments or interest were booked.
    Undetermined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub start: NaiveDate,
    pub horizon_days: u32,
    pub card: CardModel,
    pub debit_series: Vec<BalancePoint>,
    pub credit_series: Vec<BalancePoint>,
    pub debit_bills: Vec<ScheduledItem>,
    pub credit_bills: Vec<ScheduledItem>,
    pub incomes: Vec<ScheduledItem>,
}

impl Projection {
    pub fn final_debit(&self) -> Option<i64> {
        self.debit_series.last().map(|p| p.balance)
    }

    pub fn final_credit(&self) -> Option<i64> {
        self.credit_series.last().map(|p| p.balance)
    }

    pub fn debit_balances(&self) -> Vec<i64> {
        self.debit_series.iter().map(|p| p.balance).collect()
    }
}

/// Per-day deltas indexed by offset from the start date.
struct DailyDeltas {
    debit: Vec<i64>,
    credit: Vec<i64>,
    income: Vec<i64>,
}

impl DailyDeltas {
    fn new(days: usize) -> Self {
        Self {
            debit: vec![0; days],
            credit: vec![0; days],
            income: vec![0; days],
        }
    }
}

pub fn project(
    bills: &[RecurringEntry],
    incomes: &[RecurringEntry],
    settings: &ProjectionSettings,
    start: NaiveDate,
    horizon_days: u32,
) -> Result<Projection, ForecastError> {
    check_window(start, horizon_days)?;
    let len = horizon_days as usize + 1;
    let offset = |date: NaiveDate| (date - start).num_days() as usize;

    let mut deltas = DailyDeltas::new(len);
    let mut debit_bills = Vec::new();
    let mut credit_bills = Vec::new();
    let mut income_items = Vec::new();

    // Callers should never hand us a synthetic entry, but if they echo one back
    // it must not be counted twice.
    for bill in bills.iter().filter(|b| !b.synthetic) {
        for occ in expand(bill, EntryRole::Bill, start, horizon_days) {
            let day = offset(occ.date);
            match bill.kind {
                EntryKind::Debit => {
                    deltas.debit[day] = deltas.debit[day].saturating_add(occ.signed_amount);
                    debit_bills.push(ScheduledItem::from(&occ));
                }
                EntryKind::Credit => {
                    deltas.credit[day] = deltas.credit[day].saturating_add(occ.signed_amount);
                    credit_bills.push(ScheduledItem::from(&occ));
                }
            }
        }
    }

    for income in incomes {
        for occ in expand(income, EntryRole::Income, start, horizon_days) {
            let day = offset(occ.date);
            deltas.income[day] = deltas.income[day].saturating_add(occ.signed_amount);
            income_items.push(ScheduledItem::from(&occ));
        }
    }

    let card = match derive_payment_entry(settings) {
        Ok(None) => CardModel::NotConfigured,
        Ok(Some(entry)) => {
            let rule = PaymentRule::resolve(settings)?;
            let mut due = vec![false; len];
            for occ in expand(&entry, EntryRole::Bill, start, horizon_days) {
                due[offset(occ.date)] = true;
            }
            let payments = replay_card(&mut deltas, &due, rule, settings);
            debit_bills.extend(payments.into_iter().map(|(day, amount)| ScheduledItem {
                date: date_at(start, day),
                name: CARD_PAYMENT_NAME.to_string(),
                amount,
            }));
            CardModel::Modeled
        }
        Err(err) => {
            info!("{err}; projecting without card payments");
            CardModel::Undetermined
        }
    };

    let debit_series = fold_series(start, settings.debit_start_balance, len, |day| {
        deltas.debit[day].saturating_add(deltas.income[day])
    });
    let credit_series = fold_series(start, settings.credit_start_balance, len, |day| {
        deltas.credit[day]
    });

    debug!(
        "projected {} days from {start}: {} debit bills, {} credit bills, {} incomes",
        horizon_days,
        debit_bills.len(),
        credit_bills.len(),
        income_items.len()
    );

    Ok(Projection {
        start,
        horizon_days,
        card,
        debit_series,
        credit_series,
        debit_bills,
        credit_bills,
        incomes: income_items,
    })
}

/// Walks the card balance day by day in strict order, booking a payment and
/// interest on each due date. Each due date depends on the running balance left
/// by every earlier day. Returns `(day offset, amount)` for each payment made.
fn replay_card(
    deltas: &mut DailyDeltas,
    due: &[bool],
    rule: PaymentRule,
    settings: &ProjectionSettings,
) -> Vec<(usize, i64)> {
    let mut payments = Vec::new();
    let mut running = settings.credit_start_balance;

    for (day, is_due) in due.iter().copied().enumerate() {
        let today = deltas.credit[day];
        running = running.saturating_add(today);
        if !is_due {
            continue;
        }

        // Balance carried in from earlier days, before today's own activity.
        let base = running.saturating_sub(today);
        let pay = rule.amount_for(base);
        let remaining = base - pay;
        if pay > 0 {
            deltas.debit[day] = deltas.debit[day].saturating_sub(pay);
            deltas.credit[day] = deltas.credit[day].saturating_sub(pay);
            payments.push((day, pay));
        }
        running = remaining.saturating_add(today);

        let interest = monthly_interest(settings.card_apr, remaining);
        if interest > 0 {
            deltas.credit[day] = deltas.credit[day].saturating_add(interest);
            running = running.saturating_add(interest);
        }
        debug!("card due day +{day}: base {base}, paid {pay}, interest {interest}");
    }
    payments
}

fn fold_series(
    start: NaiveDate,
    start_balance: i64,
    len: usize,
    delta_at: impl Fn(usize) -> i64,
) -> Vec<BalancePoint> {
    let mut running = start_balance;
    (0..len)
        .map(|day| {
            running = running.saturating_add(delta_at(day));
            BalancePoint {
                date: date_at(start, day),
                balance: running,
            }
        })
        .collect()
}

fn date_at(start: NaiveDate, day: usize) -> NaiveDate {
    start + Days::new(day as u64)
}
