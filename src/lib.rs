//! Cashflow projection engine.
//!
//! Takes bills, income and card settings as plain values and projects daily
//! checking and card balances over a horizon. Storage, import and rendering
//! live in the `cashcast` binary.

pub mod card;
pub mod detect;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod projection;
pub mod recurrence;
pub mod reports;
pub mod sweep;

pub use card::{PaymentRule, StatementSchedule, StatementWindow, derive_payment_entry, payment_amount_for_balance};
pub use detect::suggest;
pub use domain::{
    BalancePoint, EntryKind, EntryRole, Frequency, Occurrence, PaymentPolicy, ProjectionSettings,
    RecurringEntry, ScheduledItem, Transaction,
};
pub use error::ForecastError;
pub use projection::{CardModel, Projection, project};
pub use recurrence::expand;
