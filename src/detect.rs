//! Suggests recurring entries from transaction history.

use std::collections::BTreeMap;

use chrono::Datelike;
use log::debug;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::domain::{Frequency, RecurringEntry, Transaction};

/// Groups smaller than this are never suggested.
pub const MIN_GROUP_SIZE: usize = 3;

/// Classifies an average gap in days, or `None` if it matches no cadence.
pub fn classify_gap(avg_gap_days: f64) -> Option<Frequency> {
    if (12.0..=16.0).contains(&avg_gap_days) {
        Some(Frequency::Biweekly)
    } else if (26.0..=33.0).contains(&avg_gap_days) {
        Some(Frequency::Monthly)
    } else if (6.0..=8.0).contains(&avg_gap_days) {
        Some(Frequency::Weekly)
    } else {
        None
    }
}

pub fn suggest(transactions: &[Transaction]) -> Vec<RecurringEntry> {
    let mut groups: BTreeMap<(&str, i64), Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        groups
            .entry((tx.name.as_str(), round_whole(tx.amount)))
            .or_default()
            .push(tx);
    }

    let mut out = Vec::new();
    for ((name, _), mut items) in groups {
        if items.len() < MIN_GROUP_SIZE {
            continue;
        }
        items.sort_by_key(|tx| tx.date);

        let gaps: Vec<i64> = items
            .windows(2)
            .map(|pair| (pair[1].date - pair[0].date).num_days())
            .collect();
        let avg_gap = gaps.iter().sum::<i64>() as f64 / gaps.len() as f64;

        let Some(frequency) = classify_gap(avg_gap) else {
            debug!("'{name}': average gap {avg_gap:.1} days matches no cadence");
            continue;
        };

        let Some(latest) = items.last() else {
            continue;
        };
        let anchor = match frequency {
            Frequency::Weekly => latest.date.format("%A").to_string(),
            Frequency::Monthly => latest.date.day().to_string(),
            _ => latest.date.format("%Y-%m-%d").to_string(),
        };

        out.push(RecurringEntry::new(
            latest.name.clone(),
            round_whole(latest.amount).abs(),
            frequency,
            anchor,
            latest.kind(),
        ));
    }
    out
}

fn round_whole(amount: Decimal) -> i64 {
    amount.round().to_i64().unwrap_or(0)
}
