//! Read-only queries built on top of a projection.

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{BalancePoint, ProjectionSettings, RecurringEntry, Transaction};
use crate::error::ForecastError;
use crate::projection::{Projection, project};

/// Window used by low-balance alerts.
pub const ALERT_WINDOW_DAYS: u32 = 14;

/// Lowest balance in the series, or 0 for an empty series.
pub fn min_balance(series: &[BalancePoint]) -> i64 {
    series.iter().map(|p| p.balance).min().unwrap_or(0)
}

/// Lowest projected debit balance over `[start, start + window_days]`.
pub fn safe_to_spend(
    bills: &[RecurringEntry],
    incomes: &[RecurringEntry],
    settings: &ProjectionSettings,
    start: NaiveDate,
    window_days: u32,
) -> Result<i64, ForecastError> {
    let projection = project(bills, incomes, settings, start, window_days)?;
    Ok(min_balance(&projection.debit_series))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub bill_name: String,
    pub due_date: NaiveDate,
    pub amount: i64,
    pub paid: bool,
}

/// Debit bills due in the projection window, each marked with its paid state.
pub fn checklist(
    projection: &Projection,
    is_paid: impl Fn(&str, NaiveDate) -> bool,
) -> Vec<ChecklistItem> {
    projection
        .debit_bills
        .iter()
        .map(|bill| ChecklistItem {
            bill_name: bill.name.clone(),
            due_date: bill.date,
            amount: bill.amount,
            paid: is_paid(&bill.name, bill.date),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_income: Decimal,
    pub total_spend: Decimal,
}

/// Monday of the week containing `date`.
pub fn week_start_for(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

pub fn weekly_summary(transactions: &[Transaction], week_start: NaiveDate) -> WeeklySummary {
    let week_end = week_start + Days::new(6);
    let in_week = transactions
        .iter()
        .filter(|t| t.date >= week_start && t.date <= week_end);

    let mut income = Decimal::ZERO;
    let mut spend = Decimal::ZERO;
    for t in in_week {
        if t.amount > Decimal::ZERO {
            income += t.amount;
        } else if t.amount < Decimal::ZERO {
            spend += t.amount.abs();
        }
    }

    WeeklySummary {
        week_start,
        week_end,
        total_income: income.round_dp(2),
        total_spend: spend.round_dp(2),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    pub threshold: i64,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: String,
    pub message: String,
    pub value: i64,
}

/// One alert per enabled rule whose threshold is above `safe_to_spend`.
pub fn low_balance_alerts(rules: &[AlertRule], safe_to_spend: i64) -> Vec<Alert> {
    rules
        .iter()
        .filter(|r| r.enabled && safe_to_spend < r.threshold)
        .map(|r| Alert {
            kind: "low_balance".to_string(),
            message: format!("Balance below threshold ({})", r.threshold),
            value: safe_to_spend,
        })
        .collect()
}
