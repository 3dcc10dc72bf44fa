//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Services and rules call store methods — they never execute SQL directly.

use crate::{
    error::AmlResult,
    types::{ts_from_db, ts_to_db, Account, Customer},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

mod cases;
mod transactions;

pub struct AmlStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl AmlStore {
    pub fn open(path: &str) -> AmlResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AmlResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> AmlResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AmlResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_schema.sql"))?;
        Ok(())
    }

    /// Run `f` inside one write transaction. BEGIN IMMEDIATE takes the write
    /// lock up front, serializing concurrent submissions against the same
    /// database so balance reads and writes cannot interleave.
    pub fn with_tx<T>(&self, f: impl FnOnce(&Self) -> AmlResult<T>) -> AmlResult<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(err)
            }
        }
    }

    // ── Customer ───────────────────────────────────────────────

    pub fn insert_customer(&self, c: &Customer) -> AmlResult<()> {
        self.conn.execute(
            "INSERT INTO customer (
                customer_id, customer_type, full_name, nationality,
                residency_country, kyc_status, risk_rating
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                c.customer_id,
                c.customer_type,
                c.full_name,
                c.nationality,
                c.residency_country,
                c.kyc_status,
                c.risk_rating,
            ],
        )?;
        Ok(())
    }

    pub fn get_customer(&self, customer_id: &str) -> AmlResult<Option<Customer>> {
        self.conn
            .query_row(
                "SELECT customer_id, customer_type, full_name, nationality,
                        residency_country, kyc_status, risk_rating
                 FROM customer WHERE customer_id = ?1",
                params![customer_id],
                |row| {
                    Ok(Customer {
                        customer_id: row.get(0)?,
                        customer_type: row.get(1)?,
                        full_name: row.get(2)?,
                        nationality: row.get(3)?,
                        residency_country: row.get(4)?,
                        kyc_status: row.get(5)?,
                        risk_rating: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn customer_residency(&self, customer_id: &str) -> AmlResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT residency_country FROM customer WHERE customer_id = ?1",
                params![customer_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    // ── Account ────────────────────────────────────────────────

    pub fn insert_account(&self, a: &Account) -> AmlResult<()> {
        self.conn.execute(
            "INSERT INTO account (
                account_number, customer_id, account_type, account_status,
                branch_code, balance_amount, balance_currency, opened_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                a.account_number,
                a.customer_id,
                a.account_type,
                a.account_status,
                a.branch_code,
                a.balance_amount,
                a.balance_currency,
                ts_to_db(a.opened_date),
            ],
        )?;
        Ok(())
    }

    pub fn get_account(&self, account_number: &str) -> AmlResult<Option<Account>> {
        self.conn
            .query_row(
                "SELECT account_number, customer_id, account_type, account_status,
                        branch_code, balance_amount, balance_currency, opened_date
                 FROM account WHERE account_number = ?1",
                params![account_number],
                |row| {
                    Ok(Account {
                        account_number: row.get(0)?,
                        customer_id: row.get(1)?,
                        account_type: row.get(2)?,
                        account_status: row.get(3)?,
                        branch_code: row.get(4)?,
                        balance_amount: row.get(5)?,
                        balance_currency: row.get(6)?,
                        opened_date: parse_ts(row, 7)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn account_balance(&self, account_number: &str) -> AmlResult<f64> {
        self.conn
            .query_row(
                "SELECT balance_amount FROM account WHERE account_number = ?1",
                params![account_number],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn apply_balance_delta(&self, account_number: &str, delta: f64) -> AmlResult<()> {
        self.conn.execute(
            "UPDATE account SET balance_amount = balance_amount + ?1
             WHERE account_number = ?2",
            params![delta, account_number],
        )?;
        Ok(())
    }
}

/// Map a stored timestamp column back to `DateTime<Utc>`, surfacing bad data
/// as a column conversion error instead of panicking.
pub(crate) fn parse_ts(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    ts_from_db(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("bad timestamp: {raw}").into(),
        )
    })
}

pub(crate) fn parse_opt_ts(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(s) => ts_from_db(&s).map(Some).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                format!("bad timestamp: {s}").into(),
            )
        }),
    }
}

/// Same defensive mapping for enum columns.
pub(crate) fn parse_enum<T>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("bad enum value: {raw}").into(),
        )
    })
}
