//! Surplus sweep: how much of the projected checking balance could be moved
//! into an investment each day without the balance ever dropping below a floor.

use serde::{Deserialize, Serialize};

/// Daily equivalent of a 7% annual return.
pub fn default_daily_return() -> f64 {
    1.07_f64.powf(1.0 / 365.0) - 1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SweepResult {
    /// Investing net worth minus the baseline net worth.
    pub calculated_return: f64,
    pub total_transferred: i64,
    pub final_investment_value: f64,
    pub final_debit: i64,
    pub min_projected: i64,
    /// `min_projected - floor`.
    pub cap: i64,
}

pub fn sweep(balances: &[i64], floor: Option<i64>, daily_return: Option<f64>) -> SweepResult {
    let (Some(floor), Some(last)) = (floor, balances.last().copied()) else {
        return SweepResult {
            final_debit: balances.last().copied().unwrap_or(0),
            ..Default::default()
        };
    };
    let rate = daily_return.unwrap_or_else(default_daily_return);

    // Suffix minimum: the lowest balance from each day to the end.
    let mut min_future = balances.to_vec();
    for i in (0..min_future.len().saturating_sub(1)).rev() {
        min_future[i] = min_future[i].min(min_future[i + 1]);
    }

    let mut investment = 0.0_f64;
    let mut transferred = 0_i64;
    for allowed in min_future.iter().map(|m| m - floor) {
        investment *= 1.0 + rate;
        let today = (allowed - transferred).max(0);
        investment += today as f64;
        transferred += today;
    }

    let min_projected = min_future[0];
    let final_debit = last - transferred;
    SweepResult {
        calculated_return: (final_debit as f64 + investment) - last as f64,
        total_transferred: transferred,
        final_investment_value: investment,
        final_debit,
        min_projected,
        cap: min_projected - floor,
    }
}
