//! Transaction, alert, and high-risk flag queries, including the historical
//! lookups the detection rules run.

use super::{parse_enum, parse_ts, AmlStore};
use crate::{
    error::AmlResult,
    types::{
        ts_to_db, Alert, HighRiskFlag, Severity, Transaction, TransactionStatus, TransactionType,
    },
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

const TXN_COLUMNS: &str = "transaction_id, account_number, transaction_amount,
    transaction_currency, transaction_date, transaction_type, transaction_status,
    purpose, deposit_source_type, deposit_source_value, deposit_source_country";

fn txn_row_mapper(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        transaction_id: row.get(0)?,
        account_number: row.get(1)?,
        transaction_amount: row.get(2)?,
        transaction_currency: row.get(3)?,
        transaction_date: parse_ts(row, 4)?,
        transaction_type: parse_enum(row, 5, TransactionType::parse)?,
        transaction_status: parse_enum(row, 6, TransactionStatus::parse)?,
        purpose: row.get(7)?,
        deposit_source_type: row.get(8)?,
        deposit_source_value: row.get(9)?,
        deposit_source_country: row.get(10)?,
    })
}

fn alert_row_mapper(row: &Row<'_>) -> rusqlite::Result<Alert> {
    Ok(Alert {
        alert_id: row.get(0)?,
        account_number: row.get(1)?,
        transaction_id: row.get(2)?,
        alert_type: row.get(3)?,
        severity: parse_enum(row, 4, Severity::parse)?,
        rule_id: row.get(5)?,
        description: row.get(6)?,
        triggered_date: parse_ts(row, 7)?,
    })
}

impl AmlStore {
    // ── Transactions ───────────────────────────────────────────

    pub fn insert_transaction(&self, t: &Transaction) -> AmlResult<()> {
        self.conn.execute(
            "INSERT INTO transactions (
                transaction_id, account_number, transaction_amount,
                transaction_currency, transaction_date, transaction_type,
                transaction_status, purpose, deposit_source_type,
                deposit_source_value, deposit_source_country
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                t.transaction_id,
                t.account_number,
                t.transaction_amount,
                t.transaction_currency,
                ts_to_db(t.transaction_date),
                t.transaction_type.as_str(),
                t.transaction_status.as_str(),
                t.purpose,
                t.deposit_source_type,
                t.deposit_source_value,
                t.deposit_source_country,
            ],
        )?;
        Ok(())
    }

    pub fn update_transaction_status(
        &self,
        transaction_id: &str,
        status: TransactionStatus,
    ) -> AmlResult<()> {
        self.conn.execute(
            "UPDATE transactions SET transaction_status = ?1 WHERE transaction_id = ?2",
            params![status.as_str(), transaction_id],
        )?;
        Ok(())
    }

    pub fn get_transaction(&self, transaction_id: &str) -> AmlResult<Option<Transaction>> {
        let sql = format!("SELECT {TXN_COLUMNS} FROM transactions WHERE transaction_id = ?1");
        self.conn
            .query_row(&sql, params![transaction_id], txn_row_mapper)
            .optional()
            .map_err(Into::into)
    }

    pub fn latest_transaction(&self, account_number: &str) -> AmlResult<Option<Transaction>> {
        let sql = format!(
            "SELECT {TXN_COLUMNS} FROM transactions
             WHERE account_number = ?1
             ORDER BY transaction_date DESC LIMIT 1"
        );
        self.conn
            .query_row(&sql, params![account_number], txn_row_mapper)
            .optional()
            .map_err(Into::into)
    }

    pub fn transaction_history(
        &self,
        account_number: &str,
        limit: i64,
    ) -> AmlResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TXN_COLUMNS} FROM transactions
             WHERE account_number = ?1
             ORDER BY transaction_date DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![account_number, limit], txn_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn list_transactions(
        &self,
        account_number: Option<&str>,
        transaction_type: Option<TransactionType>,
        transaction_status: Option<TransactionStatus>,
        limit: i64,
        offset: i64,
    ) -> AmlResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TXN_COLUMNS} FROM transactions
             WHERE (?1 IS NULL OR account_number = ?1)
               AND (?2 IS NULL OR transaction_type = ?2)
               AND (?3 IS NULL OR transaction_status = ?3)
             ORDER BY transaction_date DESC
             LIMIT ?4 OFFSET ?5"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                account_number,
                transaction_type.map(|t| t.as_str()),
                transaction_status.map(|s| s.as_str()),
                limit,
                offset,
            ],
            txn_row_mapper,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn count_transactions(
        &self,
        account_number: Option<&str>,
        transaction_type: Option<TransactionType>,
        transaction_status: Option<TransactionStatus>,
    ) -> AmlResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM transactions
                 WHERE (?1 IS NULL OR account_number = ?1)
                   AND (?2 IS NULL OR transaction_type = ?2)
                   AND (?3 IS NULL OR transaction_status = ?3)",
                params![
                    account_number,
                    transaction_type.map(|t| t.as_str()),
                    transaction_status.map(|s| s.as_str()),
                ],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // ── Rule lookups ───────────────────────────────────────────

    /// Most recent trade-buy on the account at or before `before`.
    pub fn latest_prior_buy(
        &self,
        account_number: &str,
        before: DateTime<Utc>,
    ) -> AmlResult<Option<Transaction>> {
        let sql = format!(
            "SELECT {TXN_COLUMNS} FROM transactions
             WHERE account_number = ?1
               AND transaction_type = 'trade-buy'
               AND transaction_date <= ?2
             ORDER BY transaction_date DESC LIMIT 1"
        );
        self.conn
            .query_row(&sql, params![account_number, ts_to_db(before)], txn_row_mapper)
            .optional()
            .map_err(Into::into)
    }

    /// Whether any deposit landed on the account in [start, end] inclusive.
    pub fn has_deposit_in_window(
        &self,
        account_number: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AmlResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM transactions
             WHERE account_number = ?1
               AND transaction_type = 'deposit'
               AND transaction_date >= ?2 AND transaction_date <= ?3",
            params![account_number, ts_to_db(start), ts_to_db(end)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count_transactions_in_window(
        &self,
        account_number: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AmlResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM transactions
                 WHERE account_number = ?1
                   AND transaction_date >= ?2 AND transaction_date <= ?3",
                params![account_number, ts_to_db(start), ts_to_db(end)],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // ── Alerts ─────────────────────────────────────────────────

    pub fn insert_alert(&self, a: &Alert) -> AmlResult<()> {
        self.conn.execute(
            "INSERT INTO alert (
                alert_id, account_number, transaction_id, alert_type,
                severity, rule_id, description, triggered_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                a.alert_id,
                a.account_number,
                a.transaction_id,
                a.alert_type,
                a.severity.as_str(),
                a.rule_id,
                a.description,
                ts_to_db(a.triggered_date),
            ],
        )?;
        Ok(())
    }

    pub fn get_alert(&self, alert_id: &str) -> AmlResult<Option<Alert>> {
        self.conn
            .query_row(
                "SELECT alert_id, account_number, transaction_id, alert_type,
                        severity, rule_id, description, triggered_date
                 FROM alert WHERE alert_id = ?1",
                params![alert_id],
                alert_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn alerts_for_account(&self, account_number: &str) -> AmlResult<Vec<Alert>> {
        let mut stmt = self.conn.prepare(
            "SELECT alert_id, account_number, transaction_id, alert_type,
                    severity, rule_id, description, triggered_date
             FROM alert WHERE account_number = ?1
             ORDER BY triggered_date DESC",
        )?;
        let rows = stmt.query_map(params![account_number], alert_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn alerts_for_transaction(&self, transaction_id: &str) -> AmlResult<Vec<Alert>> {
        let mut stmt = self.conn.prepare(
            "SELECT alert_id, account_number, transaction_id, alert_type,
                    severity, rule_id, description, triggered_date
             FROM alert WHERE transaction_id = ?1
             ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![transaction_id], alert_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── High-risk flags ────────────────────────────────────────

    pub fn insert_high_risk_flag(&self, f: &HighRiskFlag) -> AmlResult<()> {
        self.conn.execute(
            "INSERT INTO high_risk_account (
                account_number, high_risk_flag, overall_risk_score,
                risk_source, risk_reason, detected_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                f.account_number,
                f.high_risk_flag,
                f.overall_risk_score,
                f.risk_source,
                f.risk_reason,
                ts_to_db(f.detected_date),
            ],
        )?;
        Ok(())
    }

    pub fn high_risk_flag(&self, account_number: &str) -> AmlResult<Option<HighRiskFlag>> {
        self.conn
            .query_row(
                "SELECT account_number, high_risk_flag, overall_risk_score,
                        risk_source, risk_reason, detected_date
                 FROM high_risk_account WHERE account_number = ?1
                 ORDER BY id ASC LIMIT 1",
                params![account_number],
                |row| {
                    Ok(HighRiskFlag {
                        account_number: row.get(0)?,
                        high_risk_flag: row.get(1)?,
                        overall_risk_score: row.get(2)?,
                        risk_source: row.get(3)?,
                        risk_reason: row.get(4)?,
                        detected_date: parse_ts(row, 5)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn has_active_high_risk_flag(&self, account_number: &str) -> AmlResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM high_risk_account
             WHERE account_number = ?1 AND high_risk_flag = 1",
            params![account_number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
