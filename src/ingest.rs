//! CSV transaction import.
//!
//! Expected columns (header names are matched exactly; per row, the first
//! alias column with a non-empty value wins):
//!   date | Date
//!   name | description | Description
//!   amount | Amount

use std::io::Read;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Transaction;
use crate::recurrence::parse_anchor_date;

const DATE_COLUMNS: &[&str] = &["date", "Date"];
const NAME_COLUMNS: &[&str] = &["name", "description", "Description"];
const AMOUNT_COLUMNS: &[&str] = &["amount", "Amount"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

fn parse_row_date(raw: &str) -> Option<NaiveDate> {
    parse_anchor_date(raw).or_else(|| NaiveDate::parse_from_str(raw.trim(), "%m/%d/%Y").ok())
}

fn columns(headers: &csv::StringRecord, aliases: &[&str]) -> Vec<usize> {
    aliases
        .iter()
        .filter_map(|alias| headers.iter().position(|h| h.trim() == *alias))
        .collect()
}

fn first_value<'a>(record: &'a csv::StringRecord, cols: &[usize]) -> Option<&'a str> {
    cols.iter()
        .filter_map(|&i| record.get(i))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Reads transactions from CSV. Rows without a usable date or amount are
/// skipped and counted, never fatal.
pub fn read_transactions<R: Read>(input: R) -> Result<(Vec<Transaction>, ImportReport)> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();

    let date_cols = columns(&headers, DATE_COLUMNS);
    let name_cols = columns(&headers, NAME_COLUMNS);
    let amount_cols = columns(&headers, AMOUNT_COLUMNS);

    let mut out = Vec::new();
    let mut report = ImportReport::default();

    for (line, record) in rdr.records().enumerate() {
        let Ok(record) = record else {
            report.skipped += 1;
            continue;
        };

        let parsed = first_value(&record, &date_cols).and_then(parse_row_date).zip(
            first_value(&record, &amount_cols).and_then(|raw| raw.parse::<Decimal>().ok()),
        );
        let Some((date, amount)) = parsed else {
            debug!("skipping CSV row {}", line + 2);
            report.skipped += 1;
            continue;
        };

        out.push(Transaction::new(date, first_value(&record, &name_cols).unwrap_or(""), amount));
        report.imported += 1;
    }

    Ok((out, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_aliases_and_both_date_styles() {
        let csv = "Date,Description,Amount\n\
                   2024-01-05,Payroll,1200.00\n\
                   01/09/2024,Coffee,-4.50\n";
        let (txs, report) = read_transactions(csv.as_bytes()).unwrap();

        assert_eq!(report, ImportReport { imported: 2, skipped: 0 });
        assert_eq!(txs[0].name, "Payroll");
        assert_eq!(txs[1].date, NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert_eq!(txs[1].amount, "-4.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn bad_rows_are_counted_not_fatal() {
        let csv = "date,name,amount\n\
                   2024-01-05,Ok,-10\n\
                   ,Missing date,-10\n\
                   2024-13-40,Bad date,-10\n\
                   2024-01-06,Bad amount,ten\n\
                   2024-01-07,No amount\n";
        let (txs, report) = read_transactions(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(report, ImportReport { imported: 1, skipped: 4 });
    }

    #[test]
    fn name_column_is_optional() {
        let csv = "date,amount\n2024-01-05,-3\n";
        let (txs, _) = read_transactions(csv.as_bytes()).unwrap();
        assert_eq!(txs[0].name, "");
    }

    #[test]
    fn empty_name_falls_back_to_description() {
        let csv = "date,name,Description,amount\n\
                   2024-01-05,,Grocer,-20\n\
                   2024-01-06,Cafe,Coffee shop,-4\n";
        let (txs, _) = read_transactions(csv.as_bytes()).unwrap();
        assert_eq!(txs[0].name, "Grocer");
        assert_eq!(txs[1].name, "Cafe");
    }
}
