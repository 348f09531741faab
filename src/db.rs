use crate::config::{AppConfig, AppPaths, profile_slug};
use anyhow::{Context, Result};
use cashcast::domain::{
    EntryKind, EntryRole, Frequency, PaymentPolicy, ProjectionSettings, RecurringEntry,
    Transaction,
};
use cashcast::reports::AlertRule;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

/// Portable snapshot of a profile. Absent sections are left untouched on restore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileBackup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<AppConfig>,
    #[serde(default)]
    pub settings: Option<ProjectionSettings>,
    #[serde(default)]
    pub bills: Option<Vec<RecurringEntry>>,
    #[serde(default)]
    pub incomes: Option<Vec<RecurringEntry>>,
    #[serde(default)]
    pub alerts: Option<Vec<AlertRule>>,
}

#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub id: Uuid,
    pub entry: RecurringEntry,
    pub created_at: DateTime<Utc>,
}

pub struct Db {
    conn: Connection,
}

fn role_key(role: EntryRole) -> &'static str {
    match role {
        EntryRole::Bill => "bill",
        EntryRole::Income => "income",
    }
}

impl Db {
    pub fn open(paths: &AppPaths, profile: &str) -> Result<(Self, PathBuf)> {
        let slug = profile_slug(profile);
        let dir = paths.data_dir.join("profiles").join(slug);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create profile dir {}", dir.display()))?;

        let db_path = dir.join("cashcast.sqlite3");
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open DB {}", db_path.display()))?;

        let db = Self { conn };
        db.migrate()?;
        Ok((db, db_path))
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id TEXT PRIMARY KEY,
                role TEXT NOT NULL,
                name TEXT NOT NULL,
                amount INTEGER NOT NULL,
                frequency TEXT NOT NULL,
                anchor TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_entries_role ON entries(role);

            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                debit_balance INTEGER NOT NULL,
                credit_balance INTEGER NOT NULL,
                card_due_day INTEGER,
                card_policy TEXT NOT NULL,
                card_policy_value INTEGER,
                card_apr TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                name TEXT NOT NULL,
                amount TEXT NOT NULL,
                kind TEXT NOT NULL,
                source TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

            CREATE TABLE IF NOT EXISTS bill_payments (
                bill_name TEXT NOT NULL,
                due_date TEXT NOT NULL,
                paid INTEGER NOT NULL,
                paid_at TEXT,
                PRIMARY KEY (bill_name, due_date)
            );

            CREATE TABLE IF NOT EXISTS alerts (
                id TEXT PRIMARY KEY,
                threshold INTEGER NOT NULL,
                enabled INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn insert_entry(&self, role: EntryRole, entry: &RecurringEntry) -> Result<Uuid> {
        insert_entry_on(&self.conn, role, entry)
    }

    pub fn list_entries(&self, role: EntryRole) -> Result<Vec<StoredEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, amount, frequency, anchor, kind, created_at
            FROM entries
            WHERE role = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )?;

        let rows = stmt.query_map(params![role_key(role)], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let amount: i64 = row.get(2)?;
            let frequency: String = row.get(3)?;
            let anchor: String = row.get(4)?;
            let kind: String = row.get(5)?;
            let created_at: DateTime<Utc> = row.get(6)?;
            Ok((id, name, amount, frequency, anchor, kind, created_at))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, name, amount, frequency, anchor, kind, created_at) = row?;
            let id = Uuid::parse_str(&id).context("Invalid entry UUID in DB")?;
            out.push(StoredEntry {
                id,
                entry: RecurringEntry::new(
                    name,
                    amount,
                    Frequency::parse(&frequency),
                    anchor,
                    EntryKind::parse(&kind),
                ),
                created_at,
            });
        }
        Ok(out)
    }

    pub fn entries(&self, role: EntryRole) -> Result<Vec<RecurringEntry>> {
        Ok(self
            .list_entries(role)?
            .into_iter()
            .map(|s| s.entry)
            .collect())
    }

    pub fn remove_entry(&self, role: EntryRole, name: &str) -> Result<usize> {
        let n = self.conn.execute(
            "DELETE FROM entries WHERE role = ?1 AND name = ?2",
            params![role_key(role), name],
        )?;
        Ok(n)
    }

    pub fn load_settings(&self) -> Result<ProjectionSettings> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT debit_balance, credit_balance, card_due_day, card_policy,
                       card_policy_value, card_apr
                FROM settings WHERE id = 1
                "#,
                [],
                |row| {
                    let debit: i64 = row.get(0)?;
                    let credit: i64 = row.get(1)?;
                    let due_day: Option<u32> = row.get(2)?;
                    let policy: String = row.get(3)?;
                    let value: Option<i64> = row.get(4)?;
                    let apr: String = row.get(5)?;
                    Ok((debit, credit, due_day, policy, value, apr))
                },
            )
            .optional()?;

        let Some((debit, credit, due_day, policy, value, apr)) = row else {
            return Ok(ProjectionSettings::default());
        };

        Ok(ProjectionSettings {
            debit_start_balance: debit,
            credit_start_balance: credit,
            card_due_day: due_day,
            card_payment_policy: PaymentPolicy::parse(&policy).unwrap_or_default(),
            card_payment_value: value,
            card_apr: apr
                .parse::<Decimal>()
                .context("Invalid decimal APR in settings table")?,
        })
    }

    pub fn save_settings(&self, s: &ProjectionSettings) -> Result<()> {
        save_settings_on(&self.conn, s)
    }

    pub fn insert_transactions(&mut self, txs: &[Transaction], source: &str) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO transactions (id, date, name, amount, kind, source)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for t in txs {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    t.date,
                    t.name,
                    t.amount.to_string(),
                    t.kind().as_str(),
                    source,
                ])?;
            }
        }
        tx.commit()?;
        Ok(txs.len())
    }

    /// Transactions ordered by date, optionally limited to an inclusive range.
    pub fn list_transactions(&self, range: Option<(NaiveDate, NaiveDate)>) -> Result<Vec<Transaction>> {
        let (from, to) = match range {
            Some((from, to)) => (from.format("%F").to_string(), to.format("%F").to_string()),
            None => ("0000-01-01".to_string(), "9999-12-31".to_string()),
        };
        let mut stmt = self.conn.prepare(
            r#"
            SELECT date, name, amount
            FROM transactions
            WHERE date >= ?1 AND date <= ?2
            ORDER BY date ASC, rowid ASC
            "#,
        )?;

        let rows = stmt.query_map(params![from, to], |row| {
            let date: NaiveDate = row.get(0)?;
            let name: String = row.get(1)?;
            let amount: String = row.get(2)?;
            Ok((date, name, amount))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (date, name, amount) = row?;
            let amount = amount
                .parse::<Decimal>()
                .context("Invalid decimal amount in transactions table")?;
            out.push(Transaction::new(date, name, amount));
        }
        Ok(out)
    }

    pub fn set_paid(&self, bill_name: &str, due_date: NaiveDate, paid: bool) -> Result<()> {
        let paid_at = paid.then(Utc::now);
        self.conn.execute(
            r#"
            INSERT INTO bill_payments (bill_name, due_date, paid, paid_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(bill_name, due_date) DO UPDATE SET
                paid = excluded.paid,
                paid_at = excluded.paid_at
            "#,
            params![bill_name, due_date, paid, paid_at],
        )?;
        Ok(())
    }

    pub fn payments(&self) -> Result<BTreeMap<(String, NaiveDate), bool>> {
        let mut stmt = self
            .conn
            .prepare("SELECT bill_name, due_date, paid FROM bill_payments")?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let due: NaiveDate = row.get(1)?;
            let paid: bool = row.get(2)?;
            Ok(((name, due), paid))
        })?;

        let mut out = BTreeMap::new();
        for row in rows {
            let (key, paid) = row?;
            out.insert(key, paid);
        }
        Ok(out)
    }

    pub fn insert_alert(&self, rule: AlertRule) -> Result<Uuid> {
        insert_alert_on(&self.conn, rule)
    }

    pub fn list_alerts(&self) -> Result<Vec<AlertRule>> {
        let mut stmt = self
            .conn
            .prepare("SELECT threshold, enabled FROM alerts ORDER BY rowid ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(AlertRule {
                threshold: row.get(0)?,
                enabled: row.get(1)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Replaces whatever parts of the profile the backup carries, atomically.
    pub fn restore(&mut self, backup: &ProfileBackup) -> Result<()> {
        let tx = self.conn.transaction()?;
        if let Some(settings) = &backup.settings {
            save_settings_on(&tx, settings)?;
        }
        for (role, entries) in [
            (EntryRole::Bill, &backup.bills),
            (EntryRole::Income, &backup.incomes),
        ] {
            let Some(entries) = entries else { continue };
            tx.execute("DELETE FROM entries WHERE role = ?1", params![role_key(role)])?;
            for entry in entries.iter().filter(|e| !e.synthetic) {
                insert_entry_on(&tx, role, entry)?;
            }
        }
        if let Some(alerts) = &backup.alerts {
            tx.execute("DELETE FROM alerts", [])?;
            for rule in alerts {
                insert_alert_on(&tx, *rule)?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn insert_entry_on(conn: &Connection, role: EntryRole, entry: &RecurringEntry) -> Result<Uuid> {
    let id = Uuid::new_v4();
    conn.execute(
        r#"
        INSERT INTO entries (id, role, name, amount, frequency, anchor, kind, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            id.to_string(),
            role_key(role),
            entry.name,
            entry.amount,
            entry.frequency.as_str(),
            entry.anchor,
            entry.kind.as_str(),
            Utc::now(),
        ],
    )?;
    Ok(id)
}

fn save_settings_on(conn: &Connection, s: &ProjectionSettings) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO settings (id, debit_balance, credit_balance, card_due_day, card_policy,
                              card_policy_value, card_apr)
        VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            debit_balance = excluded.debit_balance,
            credit_balance = excluded.credit_balance,
            card_due_day = excluded.card_due_day,
            card_policy = excluded.card_policy,
            card_policy_value = excluded.card_policy_value,
            card_apr = excluded.card_apr
        "#,
        params![
            s.debit_start_balance,
            s.credit_start_balance,
            s.card_due_day,
            s.card_payment_policy.as_str(),
            s.card_payment_value,
            s.card_apr.to_string(),
        ],
    )?;
    Ok(())
}

fn insert_alert_on(conn: &Connection, rule: AlertRule) -> Result<Uuid> {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO alerts (id, threshold, enabled) VALUES (?1, ?2, ?3)",
        params![id.to_string(), rule.threshold, rule.enabled],
    )?;
    Ok(id)
}
