mod cli;
mod config;
mod db;

use anyhow::{Context, Result, anyhow};
use cashcast::card::statement_windows;
use cashcast::domain::{EntryRole, ProjectionSettings, RecurringEntry};
use cashcast::error::ForecastError;
use cashcast::ingest::read_transactions;
use cashcast::projection::{CardModel, Projection, project};
use cashcast::recurrence::parse_anchor_date;
use cashcast::reports::{
    ALERT_WINDOW_DAYS, AlertRule, checklist, low_balance_alerts, safe_to_spend, week_start_for,
    weekly_summary,
};
use cashcast::{detect, sweep};
use chrono::{Local, NaiveDate};
use clap::Parser;
use log::info;
use std::fs::{self, File};
use std::path::Path;

use crate::cli::{
    AlertCmd, BillCmd, ChecklistCmd, Cli, Command, IncomeCmd, ProfileCmd, SettingsCmd, TxCmd,
    WindowArgs,
};
use crate::config::{AppConfig, AppPaths, app_paths, load_or_init_config, write_config};
use crate::db::{Db, ProfileBackup};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let paths = app_paths(cli.home.clone())?;
    let (mut cfg, cfg_path) = load_or_init_config(&paths)?;

    let command = match cli.command {
        Command::Profile(args) => return handle_profile(&paths, &mut cfg, &cfg_path, args.cmd),
        other => other,
    };

    let (mut db, db_path) = Db::open(&paths, &cfg.current_profile)?;
    info!("using {}", db_path.display());

    match command {
        Command::Bill(args) => handle_bill(&db, args.cmd)?,
        Command::Income(args) => handle_income(&db, args.cmd)?,
        Command::Settings(args) => handle_settings(&db, args.cmd)?,
        Command::Forecast(args) => {
            let p = run_projection(&db, &args.window, cfg.forecast_days)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&p)?);
            } else {
                print_forecast(&p);
            }
        }
        Command::SafeToSpend(window) => {
            let days = window.days.unwrap_or(cfg.safe_to_spend_days);
            let start = parse_start(window.start.as_deref())?;
            let value = safe_to_spend(
                &db.entries(EntryRole::Bill)?,
                &db.entries(EntryRole::Income)?,
                &db.load_settings()?,
                start,
                days,
            )?;
            println!("safe_to_spend\t{value}\tdays\t{days}");
        }
        Command::Checklist(args) => match args.cmd {
            Some(ChecklistCmd::Mark {
                name,
                due_date,
                unpaid,
            }) => {
                let due = parse_date(&due_date)?;
                db.set_paid(&name, due, !unpaid)?;
                let state = if unpaid { "unpaid" } else { "paid" };
                println!("Marked '{name}' due {due} as {state}.");
            }
            None => {
                let p = run_projection(&db, &args.window, cfg.forecast_days)?;
                let payments = db.payments()?;
                let items = checklist(&p, |name, due| {
                    payments
                        .get(&(name.to_string(), due))
                        .copied()
                        .unwrap_or(false)
                });
                if items.is_empty() {
                    println!("(nothing due)");
                    return Ok(());
                }
                println!("due_date\tbill\tamount\tpaid");
                for item in items {
                    let paid = if item.paid { "yes" } else { "no" };
                    println!(
                        "{}\t{}\t{}\t{}",
                        item.due_date, item.bill_name, item.amount, paid
                    );
                }
            }
        },
        Command::Statement(window) => {
            let days = window.days.unwrap_or(cfg.forecast_days);
            let start = parse_start(window.start.as_deref())?;
            let settings = db.load_settings()?;
            if settings.card_due_day.is_none() {
                return Err(anyhow!(
                    "No card due day configured. Set one with: cashcast settings set --card-due-day <1-31>"
                ));
            }
            let sched = statement_windows(&db.entries(EntryRole::Bill)?, &settings, start, days)?;
            let rows: Vec<Vec<String>> = sched
                .windows
                .iter()
                .map(|w| {
                    vec![
                        w.start.to_string(),
                        w.end.to_string(),
                        w.charges_total.to_string(),
                        w.balance_included.to_string(),
                        w.total.to_string(),
                    ]
                })
                .collect();
            print_table(&["from", "due", "charges", "carried", "total"], &rows);
        }
        Command::Sweep(args) => {
            let p = run_projection(&db, &args.window, cfg.forecast_days)?;
            let floor = args.floor.unwrap_or(cfg.debit_floor_target);
            let r = sweep::sweep(&p.debit_balances(), Some(floor), None);
            println!("floor\t{floor}");
            println!("min_projected\t{}", r.min_projected);
            println!("cap\t{}", r.cap);
            println!("total_transferred\t{}", r.total_transferred);
            println!("final_investment_value\t{:.2}", r.final_investment_value);
            println!("final_debit\t{}", r.final_debit);
            println!("calculated_return\t{:.2}", r.calculated_return);
        }
        Command::Tx(args) => handle_tx(&mut db, args.cmd)?,
        Command::Alert(args) => match args.cmd {
            AlertCmd::Add {
                threshold,
                disabled,
            } => {
                let id = db.insert_alert(AlertRule {
                    threshold,
                    enabled: !disabled,
                })?;
                println!("Added low-balance alert {id} at {threshold}.");
            }
            AlertCmd::Check { start } => {
                let start = parse_start(start.as_deref())?;
                let rules = db.list_alerts()?;
                let value = safe_to_spend(
                    &db.entries(EntryRole::Bill)?,
                    &db.entries(EntryRole::Income)?,
                    &db.load_settings()?,
                    start,
                    ALERT_WINDOW_DAYS,
                )?;
                let alerts = low_balance_alerts(&rules, value);
                if alerts.is_empty() {
                    println!("(no alerts)");
                }
                for a in alerts {
                    println!("{}\t{}\t{}", a.kind, a.message, a.value);
                }
            }
        },
        Command::Export => {
            let backup = ProfileBackup {
                profile: Some(cfg.current_profile.clone()),
                config: Some(cfg.clone()),
                settings: Some(db.load_settings()?),
                bills: Some(db.entries(EntryRole::Bill)?),
                incomes: Some(db.entries(EntryRole::Income)?),
                alerts: Some(db.list_alerts()?),
            };
            println!("{}", serde_json::to_string_pretty(&backup)?);
        }
        Command::Restore { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let backup: ProfileBackup = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse backup {}", file.display()))?;
            db.restore(&backup)?;

            if let Some(restored) = &backup.config {
                cfg.forecast_days = restored.forecast_days;
                cfg.safe_to_spend_days = restored.safe_to_spend_days;
                cfg.debit_floor_target = restored.debit_floor_target;
                write_config(&cfg_path, &cfg)?;
            }
            println!(
                "Restored profile '{}': {} bills, {} incomes, {} alerts.",
                cfg.current_profile,
                backup.bills.as_ref().map_or(0, Vec::len),
                backup.incomes.as_ref().map_or(0, Vec::len),
                backup.alerts.as_ref().map_or(0, Vec::len),
            );
        }
        Command::Profile(_) => {}
    }

    Ok(())
}

fn handle_profile(
    paths: &AppPaths,
    cfg: &mut AppConfig,
    cfg_path: &Path,
    cmd: ProfileCmd,
) -> Result<()> {
    match cmd {
        ProfileCmd::Check => {
            println!("Current profile: {}", cfg.current_profile);
        }
        ProfileCmd::Checkout { name } => {
            let _ = Db::open(paths, &name)?;
            cfg.current_profile = name.clone();
            write_config(cfg_path, cfg)?;
            println!("Checked out profile: {name}");
        }
    }
    Ok(())
}

fn run_projection(db: &Db, window: &WindowArgs, default_days: u32) -> Result<Projection> {
    let days = window.days.unwrap_or(default_days);
    let start = parse_start(window.start.as_deref())?;
    let settings = db.load_settings()?;
    let p = project(
        &db.entries(EntryRole::Bill)?,
        &db.entries(EntryRole::Income)?,
        &settings,
        start,
        days,
    )?;

    if p.card == CardModel::Undetermined {
        let err = ForecastError::PaymentUndetermined {
            policy: settings.card_payment_policy,
        };
        eprintln!("warning: {err}; card payments are not modeled in this forecast");
    }
    Ok(p)
}

fn handle_bill(db: &Db, cmd: BillCmd) -> Result<()> {
    match cmd {
        BillCmd::Add {
            name,
            amount,
            entry,
            kind,
        } => {
            let bill = RecurringEntry::new(name, amount, entry.frequency, entry.anchor, kind);
            db.insert_entry(EntryRole::Bill, &bill)?;
            println!(
                "Added {} bill '{}' {} {} on {}.",
                bill.kind, bill.name, bill.amount, bill.frequency, bill.anchor
            );
        }
        BillCmd::List => print_entries(db, EntryRole::Bill)?,
        BillCmd::Remove { name } => {
            if db.remove_entry(EntryRole::Bill, &name)? == 0 {
                return Err(anyhow!("No such bill: '{name}'"));
            }
            println!("Removed bill '{name}'.");
        }
    }
    Ok(())
}

fn handle_income(db: &Db, cmd: IncomeCmd) -> Result<()> {
    match cmd {
        IncomeCmd::Add {
            name,
            amount,
            entry,
        } => {
            let income = RecurringEntry::income(name, amount, entry.frequency, entry.anchor);
            db.insert_entry(EntryRole::Income, &income)?;
            println!(
                "Added income '{}' {} {} on {}.",
                income.name, income.amount, income.frequency, income.anchor
            );
        }
        IncomeCmd::List => print_entries(db, EntryRole::Income)?,
        IncomeCmd::Remove { name } => {
            if db.remove_entry(EntryRole::Income, &name)? == 0 {
                return Err(anyhow!("No such income: '{name}'"));
            }
            println!("Removed income '{name}'.");
        }
    }
    Ok(())
}

fn print_entries(db: &Db, role: EntryRole) -> Result<()> {
    let stored = db.list_entries(role)?;
    if stored.is_empty() {
        println!("(none)");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = stored
        .iter()
        .map(|s| {
            vec![
                s.entry.name.clone(),
                s.entry.amount.to_string(),
                s.entry.frequency.to_string(),
                s.entry.anchor.clone(),
                s.entry.kind.to_string(),
                s.created_at.format("%Y-%m-%d").to_string(),
                s.id.to_string(),
            ]
        })
        .collect();
    print_table(
        &["name", "amount", "frequency", "anchor", "kind", "added", "id"],
        &rows,
    );
    Ok(())
}

fn handle_settings(db: &Db, cmd: SettingsCmd) -> Result<()> {
    match cmd {
        SettingsCmd::Show => print_settings(&db.load_settings()?),
        SettingsCmd::Set {
            debit_balance,
            credit_balance,
            card_due_day,
            clear_card_due_day,
            policy,
            policy_value,
            apr,
        } => {
            let mut s = db.load_settings()?;
            if let Some(v) = debit_balance {
                s.debit_start_balance = v;
            }
            if let Some(v) = credit_balance {
                s.credit_start_balance = v;
            }
            if clear_card_due_day {
                s.card_due_day = None;
            } else if card_due_day.is_some() {
                s.card_due_day = card_due_day;
            }
            if let Some(p) = policy {
                s.card_payment_policy = p;
            }
            if policy_value.is_some() {
                s.card_payment_value = policy_value;
            }
            if let Some(apr) = apr {
                s.card_apr = apr;
            }
            db.save_settings(&s)?;
            print_settings(&s);
        }
    }
    Ok(())
}

fn print_settings(s: &ProjectionSettings) {
    let opt = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    println!("debit_balance\t{}", s.debit_start_balance);
    println!("credit_balance\t{}", s.credit_start_balance);
    println!("card_due_day\t{}", opt(s.card_due_day.map(i64::from)));
    println!("card_policy\t{}", s.card_payment_policy);
    println!("card_policy_value\t{}", opt(s.card_payment_value));
    println!("card_apr\t{}", s.card_apr);
}

fn print_forecast(p: &Projection) {
    println!("date\tdebit\tcredit");
    for (debit, credit) in p.debit_series.iter().zip(&p.credit_series) {
        println!("{}\t{}\t{}", debit.date, debit.balance, credit.balance);
    }

    let mut upcoming: Vec<(NaiveDate, &str, &str, i64)> = Vec::new();
    upcoming.extend(p.debit_bills.iter().map(|b| (b.date, "debit", b.name.as_str(), b.amount)));
    upcoming.extend(p.credit_bills.iter().map(|b| (b.date, "credit", b.name.as_str(), b.amount)));
    upcoming.extend(p.incomes.iter().map(|i| (i.date, "income", i.name.as_str(), i.amount)));
    upcoming.sort();

    if upcoming.is_empty() {
        return;
    }
    println!();
    let rows: Vec<Vec<String>> = upcoming
        .into_iter()
        .map(|(date, kind, name, amount)| {
            vec![
                date.to_string(),
                kind.to_string(),
                name.to_string(),
                amount.to_string(),
            ]
        })
        .collect();
    print_table(&["date", "type", "name", "amount"], &rows);
}

fn handle_tx(db: &mut Db, cmd: TxCmd) -> Result<()> {
    match cmd {
        TxCmd::Import { file } => {
            let f = File::open(&file).with_context(|| format!("Failed to open {}", file.display()))?;
            let (txs, report) = read_transactions(f)
                .with_context(|| format!("Failed to import {}", file.display()))?;
            db.insert_transactions(&txs, "csv")?;
            println!(
                "Imported {} transactions ({} skipped).",
                report.imported, report.skipped
            );
        }
        TxCmd::List { range } => {
            let range = range.as_deref().map(parse_date_range).transpose()?;
            let txs = db.list_transactions(range)?;
            println!("date\tname\tamount\ttype");
            for t in txs {
                println!("{}\t{}\t{}\t{}", t.date, t.name, t.amount, t.kind());
            }
        }
        TxCmd::Suggest => {
            let suggestions = detect::suggest(&db.list_transactions(None)?);
            if suggestions.is_empty() {
                println!("(no suggestions)");
                return Ok(());
            }
            println!("name\tamount\tfrequency\tanchor\ttype");
            for s in suggestions {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    s.name, s.amount, s.frequency, s.anchor, s.kind
                );
            }
        }
        TxCmd::Weekly { start } => {
            let week_start = match start.as_deref() {
                Some(raw) => parse_date(raw)?,
                None => week_start_for(today()),
            };
            let summary = weekly_summary(&db.list_transactions(None)?, week_start);
            println!("week_start\t{}", summary.week_start);
            println!("week_end\t{}", summary.week_end);
            println!("total_income\t{}", summary.total_income);
            println!("total_spend\t{}", summary.total_spend);
        }
    }
    Ok(())
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if headers.is_empty() {
        println!("(no columns)");
        return;
    }

    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();

    for row in rows {
        for (i, cell) in row.iter().take(cols).enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    fn print_row(cells: &[String], widths: &[usize]) {
        print!("|");
        for (i, w) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            print!(" {:width$} |", cell, width = *w);
        }
        println!();
    }

    fn print_sep(widths: &[usize]) {
        print!("|");
        for w in widths {
            print!("{}|", "-".repeat(w + 2));
        }
        println!();
    }

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    print_row(&header_cells, &widths);
    print_sep(&widths);
    for row in rows {
        print_row(row, &widths);
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_start(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        None => Ok(today()),
        Some(s) => parse_date(s),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    parse_anchor_date(raw).ok_or_else(|| anyhow!("Invalid date '{raw}'. Expected YYYY-MM-DD"))
}

fn parse_date_range(raw: &str) -> Result<(NaiveDate, NaiveDate)> {
    let (start, end) = raw
        .split_once("..")
        .ok_or_else(|| anyhow!("Invalid --range. Expected YYYY-MM-DD..YYYY-MM-DD"))?;
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")?;
    if end < start {
        return Err(anyhow!("Invalid --range: end is before start"));
    }
    Ok((start, end))
}
