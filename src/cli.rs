use cashcast::domain::{EntryKind, Frequency, PaymentPolicy};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

#[derive(Debug, Parser)]
#[command(name = "cashcast")]
#[command(about = "Bills, income and credit-card cashflow forecaster", long_about = None)]
pub struct Cli {
    /// Override Cashcast home directory (config/data subdirs will be created inside it).
    #[arg(long, env = "CASHCAST_HOME")]
    pub home: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Bill(BillArgs),
    Income(IncomeArgs),
    Settings(SettingsArgs),

    Forecast(ForecastArgs),
    SafeToSpend(WindowArgs),
    Checklist(ChecklistArgs),
    Statement(WindowArgs),
    Sweep(SweepArgs),

    Tx(TxArgs),
    Alert(AlertArgs),
    Export,
    /// Replace settings, bills, incomes and alerts from an `export` JSON file.
    Restore {
        file: std::path::PathBuf,
    },
    Profile(ProfileArgs),
}

fn parse_frequency(raw: &str) -> Result<Frequency, String> {
    Ok(Frequency::parse(raw))
}

fn parse_kind(raw: &str) -> Result<EntryKind, String> {
    Ok(EntryKind::parse(raw))
}

fn parse_policy(raw: &str) -> Result<PaymentPolicy, String> {
    PaymentPolicy::parse(raw).ok_or_else(|| format!("unknown policy '{raw}' (full|percent|fixed)"))
}

fn parse_apr(raw: &str) -> Result<Decimal, String> {
    let apr: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a decimal rate"))?;
    if apr < Decimal::ZERO || apr > Decimal::ONE_THOUSAND {
        return Err(format!("APR {apr} is outside 0..=1000"));
    }
    Ok(apr)
}

#[derive(Debug, Args, Clone)]
pub struct EntryFlags {
    /// Weekly, Biweekly, Monthly, Annually or OneTime.
    #[arg(long, short = 'f', value_parser = parse_frequency)]
    pub frequency: Frequency,

    /// Weekday name (Weekly), day of month (Monthly) or YYYY-MM-DD date.
    #[arg(long, short = 'a')]
    pub anchor: String,
}

#[derive(Debug, Subcommand)]
pub enum BillCmd {
    Add {
        name: String,
        #[arg(value_parser = clap::value_parser!(i64).range(0..))]
        amount: i64,
        #[command(flatten)]
        entry: EntryFlags,
        /// debit (checking) or credit (card).
        #[arg(long, default_value = "debit", value_parser = parse_kind)]
        kind: EntryKind,
    },
    List,
    Remove { name: String },
}

#[derive(Debug, Args)]
pub struct BillArgs {
    #[command(subcommand)]
    pub cmd: BillCmd,
}

#[derive(Debug, Subcommand)]
pub enum IncomeCmd {
    Add {
        name: String,
        #[arg(value_parser = clap::value_parser!(i64).range(0..))]
        amount: i64,
        #[command(flatten)]
        entry: EntryFlags,
    },
    List,
    Remove { name: String },
}

#[derive(Debug, Args)]
pub struct IncomeArgs {
    #[command(subcommand)]
    pub cmd: IncomeCmd,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCmd {
    Show,
    Set {
        #[arg(long, allow_hyphen_values = true)]
        debit_balance: Option<i64>,
        #[arg(long, allow_hyphen_values = true)]
        credit_balance: Option<i64>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=31))]
        card_due_day: Option<u32>,
        #[arg(long, conflicts_with = "card_due_day")]
        clear_card_due_day: bool,
        #[arg(long, value_parser = parse_policy)]
        policy: Option<PaymentPolicy>,
        /// Percent for `percent`, amount for `fixed`.
        #[arg(long)]
        policy_value: Option<i64>,
        /// Annual percentage rate, e.g. 19.99 (0..=1000).
        #[arg(long, allow_hyphen_values = true, value_parser = parse_apr)]
        apr: Option<Decimal>,
    },
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub cmd: SettingsCmd,
}

#[derive(Debug, Args, Clone)]
pub struct WindowArgs {
    /// Horizon in days (1..=1825). Defaults come from config.
    #[arg(long)]
    pub days: Option<u32>,

    /// First projected day (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub start: Option<String>,
}

#[derive(Debug, Args)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Print the full projection as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum ChecklistCmd {
    /// Record a due bill as paid (or unpaid with --unpaid).
    Mark {
        name: String,
        due_date: String,
        #[arg(long)]
        unpaid: bool,
    },
}

#[derive(Debug, Args)]
pub struct ChecklistArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    #[command(subcommand)]
    pub cmd: Option<ChecklistCmd>,
}

#[derive(Debug, Args)]
pub struct SweepArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Minimum checking balance to keep. Defaults to config `debit_floor_target`.
    #[arg(long, allow_hyphen_values = true)]
    pub floor: Option<i64>,
}

#[derive(Debug, Subcommand)]
pub enum TxCmd {
    Import { file: std::path::PathBuf },
    List {
        /// YYYY-MM-DD..YYYY-MM-DD
        #[arg(long)]
        range: Option<String>,
    },
    Suggest,
    Weekly {
        /// Week start (YYYY-MM-DD). Defaults to this week's Monday.
        #[arg(long)]
        start: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct TxArgs {
    #[command(subcommand)]
    pub cmd: TxCmd,
}

#[derive(Debug, Subcommand)]
pub enum AlertCmd {
    Add {
        #[arg(allow_hyphen_values = true)]
        threshold: i64,
        #[arg(long)]
        disabled: bool,
    },
    Check {
        #[arg(long)]
        start: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct AlertArgs {
    #[command(subcommand)]
    pub cmd: AlertCmd,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCmd {
    Check,
    Checkout { name: String },
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub cmd: ProfileCmd,
}
