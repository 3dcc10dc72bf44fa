//! Detection rules.
//!
//! Each rule is a pure predicate over one transaction, its account, and a
//! read-only [`HistoryView`] of prior data. Rules never write; the rule
//! engine materializes triggered outcomes as alerts. A rule that finds no
//! usable historical context (e.g. no prior trade-buy) reports not-triggered
//! rather than failing.

use crate::{
    config::RuleThresholds,
    error::AmlResult,
    store::AmlStore,
    types::{Account, Severity, Transaction, TransactionType},
};
use chrono::{DateTime, Duration, Utc};

/// Read-only historical lookups injected into rules, so each rule stays pure
/// and unit-testable without a database.
pub trait HistoryView {
    /// Most recent trade-buy on the account at or before `before`.
    fn latest_prior_buy(
        &self,
        account_number: &str,
        before: DateTime<Utc>,
    ) -> AmlResult<Option<Transaction>>;

    /// Whether any deposit landed on the account within [start, end].
    fn has_deposit_in_window(
        &self,
        account_number: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AmlResult<bool>;

    /// Count of all transactions on the account within [start, end].
    fn count_transactions_in_window(
        &self,
        account_number: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AmlResult<i64>;

    /// Residency country of the customer owning the account, if known.
    fn customer_residency(&self, customer_id: &str) -> AmlResult<Option<String>>;

    /// Whether the account carries an active (flag=1) high-risk marker.
    fn has_active_high_risk_flag(&self, account_number: &str) -> AmlResult<bool>;
}

impl HistoryView for AmlStore {
    fn latest_prior_buy(
        &self,
        account_number: &str,
        before: DateTime<Utc>,
    ) -> AmlResult<Option<Transaction>> {
        AmlStore::latest_prior_buy(self, account_number, before)
    }

    fn has_deposit_in_window(
        &self,
        account_number: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AmlResult<bool> {
        AmlStore::has_deposit_in_window(self, account_number, start, end)
    }

    fn count_transactions_in_window(
        &self,
        account_number: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AmlResult<i64> {
        AmlStore::count_transactions_in_window(self, account_number, start, end)
    }

    fn customer_residency(&self, customer_id: &str) -> AmlResult<Option<String>> {
        AmlStore::customer_residency(self, customer_id)
    }

    fn has_active_high_risk_flag(&self, account_number: &str) -> AmlResult<bool> {
        AmlStore::has_active_high_risk_flag(self, account_number)
    }
}

#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub triggered: bool,
    pub severity: Severity,
    pub description: String,
    pub rule_id: &'static str,
    pub rule_name: &'static str,
}

impl RuleOutcome {
    fn pass(rule_id: &'static str, rule_name: &'static str, severity: Severity) -> Self {
        Self {
            triggered: false,
            severity,
            description: String::new(),
            rule_id,
            rule_name,
        }
    }

    fn fire(
        rule_id: &'static str,
        rule_name: &'static str,
        severity: Severity,
        description: String,
    ) -> Self {
        Self {
            triggered: true,
            severity,
            description,
            rule_id,
            rule_name,
        }
    }
}

pub trait Rule {
    fn rule_id(&self) -> &'static str;
    fn rule_name(&self) -> &'static str;

    fn evaluate(
        &self,
        txn: &Transaction,
        account: &Account,
        history: &dyn HistoryView,
        cfg: &RuleThresholds,
    ) -> AmlResult<RuleOutcome>;
}

// ── RULE-01: High Deposit ────────────────────────────────────────────────────

pub struct HighDepositRule;

impl Rule for HighDepositRule {
    fn rule_id(&self) -> &'static str {
        "RULE-01"
    }

    fn rule_name(&self) -> &'static str {
        "High Deposit"
    }

    fn evaluate(
        &self,
        txn: &Transaction,
        _account: &Account,
        _history: &dyn HistoryView,
        cfg: &RuleThresholds,
    ) -> AmlResult<RuleOutcome> {
        // Boundary triggers at exact equality.
        if txn.transaction_type == TransactionType::Deposit
            && txn.transaction_amount >= cfg.deposit_threshold
        {
            return Ok(RuleOutcome::fire(
                self.rule_id(),
                self.rule_name(),
                Severity::High,
                format!(
                    "Deposit amount {} exceeds threshold {}",
                    txn.transaction_amount, cfg.deposit_threshold
                ),
            ));
        }
        Ok(RuleOutcome::pass(self.rule_id(), self.rule_name(), Severity::High))
    }
}

// ── RULE-02: Negligible Profit Trade ─────────────────────────────────────────

pub struct NegligibleProfitRule;

impl Rule for NegligibleProfitRule {
    fn rule_id(&self) -> &'static str {
        "RULE-02"
    }

    fn rule_name(&self) -> &'static str {
        "Negligible Profit Trade"
    }

    fn evaluate(
        &self,
        txn: &Transaction,
        _account: &Account,
        history: &dyn HistoryView,
        cfg: &RuleThresholds,
    ) -> AmlResult<RuleOutcome> {
        if txn.transaction_type != TransactionType::TradeSell {
            return Ok(RuleOutcome::pass(self.rule_id(), self.rule_name(), Severity::High));
        }

        if let Some(buy) = history.latest_prior_buy(&txn.account_number, txn.transaction_date)? {
            let profit = txn.transaction_amount - buy.transaction_amount;
            if profit.abs() <= cfg.negligible_profit_threshold {
                return Ok(RuleOutcome::fire(
                    self.rule_id(),
                    self.rule_name(),
                    Severity::High,
                    format!(
                        "Trade profit {} within negligible threshold {}",
                        profit, cfg.negligible_profit_threshold
                    ),
                ));
            }
        }
        Ok(RuleOutcome::pass(self.rule_id(), self.rule_name(), Severity::High))
    }
}

// ── RULE-03: Rapid Deposit-Withdrawal ────────────────────────────────────────

pub struct RapidCycleRule;

impl Rule for RapidCycleRule {
    fn rule_id(&self) -> &'static str {
        "RULE-03"
    }

    fn rule_name(&self) -> &'static str {
        "Rapid Deposit-Withdrawal"
    }

    fn evaluate(
        &self,
        txn: &Transaction,
        _account: &Account,
        history: &dyn HistoryView,
        cfg: &RuleThresholds,
    ) -> AmlResult<RuleOutcome> {
        if txn.transaction_type != TransactionType::Withdrawal {
            return Ok(RuleOutcome::pass(self.rule_id(), self.rule_name(), Severity::Medium));
        }

        let window_start = txn.transaction_date - Duration::hours(cfg.rapid_cycle_hours);
        if history.has_deposit_in_window(&txn.account_number, window_start, txn.transaction_date)? {
            return Ok(RuleOutcome::fire(
                self.rule_id(),
                self.rule_name(),
                Severity::Medium,
                format!("Withdrawal within {}h of a deposit", cfg.rapid_cycle_hours),
            ));
        }
        Ok(RuleOutcome::pass(self.rule_id(), self.rule_name(), Severity::Medium))
    }
}

// ── RULE-04: Transaction Velocity ────────────────────────────────────────────

pub struct VelocityRule;

impl Rule for VelocityRule {
    fn rule_id(&self) -> &'static str {
        "RULE-04"
    }

    fn rule_name(&self) -> &'static str {
        "Transaction Velocity"
    }

    fn evaluate(
        &self,
        txn: &Transaction,
        _account: &Account,
        history: &dyn HistoryView,
        cfg: &RuleThresholds,
    ) -> AmlResult<RuleOutcome> {
        let window_start = txn.transaction_date - Duration::minutes(cfg.velocity_window_minutes);
        // The current transaction is already recorded, so the count includes it.
        let count = history.count_transactions_in_window(
            &txn.account_number,
            window_start,
            txn.transaction_date,
        )?;
        if count >= cfg.velocity_txn_count {
            return Ok(RuleOutcome::fire(
                self.rule_id(),
                self.rule_name(),
                Severity::Medium,
                format!(
                    "{} transactions within {} minutes",
                    count, cfg.velocity_window_minutes
                ),
            ));
        }
        Ok(RuleOutcome::pass(self.rule_id(), self.rule_name(), Severity::Medium))
    }
}

// ── RULE-05: Cross-Border Mismatch ───────────────────────────────────────────

pub struct CrossBorderRule;

impl Rule for CrossBorderRule {
    fn rule_id(&self) -> &'static str {
        "RULE-05"
    }

    fn rule_name(&self) -> &'static str {
        "Cross-Border Mismatch"
    }

    fn evaluate(
        &self,
        txn: &Transaction,
        account: &Account,
        history: &dyn HistoryView,
        cfg: &RuleThresholds,
    ) -> AmlResult<RuleOutcome> {
        let severity = cfg.cross_border_severity;

        if txn.transaction_type != TransactionType::Deposit {
            return Ok(RuleOutcome::pass(self.rule_id(), self.rule_name(), severity));
        }
        let source_country = match txn.deposit_source_country.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => return Ok(RuleOutcome::pass(self.rule_id(), self.rule_name(), severity)),
        };
        let residency = match history.customer_residency(&account.customer_id)? {
            Some(r) => r,
            None => return Ok(RuleOutcome::pass(self.rule_id(), self.rule_name(), severity)),
        };

        if source_country != residency {
            return Ok(RuleOutcome::fire(
                self.rule_id(),
                self.rule_name(),
                severity,
                format!(
                    "Deposit source country {source_country} differs from residency {residency}"
                ),
            ));
        }
        Ok(RuleOutcome::pass(self.rule_id(), self.rule_name(), severity))
    }
}

// ── RULE-06: High Risk Account ───────────────────────────────────────────────

pub struct HighRiskAccountRule;

impl Rule for HighRiskAccountRule {
    fn rule_id(&self) -> &'static str {
        "RULE-06"
    }

    fn rule_name(&self) -> &'static str {
        "High Risk Account"
    }

    fn evaluate(
        &self,
        txn: &Transaction,
        _account: &Account,
        history: &dyn HistoryView,
        _cfg: &RuleThresholds,
    ) -> AmlResult<RuleOutcome> {
        if history.has_active_high_risk_flag(&txn.account_number)? {
            return Ok(RuleOutcome::fire(
                self.rule_id(),
                self.rule_name(),
                Severity::High,
                "Account is in high risk list".into(),
            ));
        }
        Ok(RuleOutcome::pass(self.rule_id(), self.rule_name(), Severity::High))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{new_id, TransactionStatus};
    use chrono::TimeZone;

    /// In-memory HistoryView stub: rules are tested without a database.
    #[derive(Default)]
    struct StubHistory {
        prior_buy: Option<Transaction>,
        deposit_in_window: bool,
        txn_count: i64,
        residency: Option<String>,
        high_risk: bool,
    }

    impl HistoryView for StubHistory {
        fn latest_prior_buy(
            &self,
            _account: &str,
            _before: DateTime<Utc>,
        ) -> AmlResult<Option<Transaction>> {
            Ok(self.prior_buy.clone())
        }

        fn has_deposit_in_window(
            &self,
            _account: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> AmlResult<bool> {
            Ok(self.deposit_in_window)
        }

        fn count_transactions_in_window(
            &self,
            _account: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> AmlResult<i64> {
            Ok(self.txn_count)
        }

        fn customer_residency(&self, _customer_id: &str) -> AmlResult<Option<String>> {
            Ok(self.residency.clone())
        }

        fn has_active_high_risk_flag(&self, _account: &str) -> AmlResult<bool> {
            Ok(self.high_risk)
        }
    }

    fn txn(kind: TransactionType, amount: f64) -> Transaction {
        Transaction {
            transaction_id: new_id("TXN"),
            account_number: "ACC-000000001".into(),
            transaction_amount: amount,
            transaction_currency: "USD".into(),
            transaction_date: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            transaction_type: kind,
            transaction_status: TransactionStatus::Pending,
            purpose: None,
            deposit_source_type: None,
            deposit_source_value: None,
            deposit_source_country: None,
        }
    }

    fn account() -> Account {
        Account {
            account_number: "ACC-000000001".into(),
            customer_id: "CUST-000001".into(),
            account_type: "checking".into(),
            account_status: "active".into(),
            branch_code: "BR-01".into(),
            balance_amount: 1_000.0,
            balance_currency: "USD".into(),
            opened_date: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn high_deposit_triggers_at_threshold_boundary() {
        let cfg = RuleThresholds::default();
        let history = StubHistory::default();

        let at = HighDepositRule
            .evaluate(&txn(TransactionType::Deposit, 10_000.0), &account(), &history, &cfg)
            .unwrap();
        assert!(at.triggered);
        assert_eq!(at.severity, Severity::High);

        let below = HighDepositRule
            .evaluate(&txn(TransactionType::Deposit, 9_999.99), &account(), &history, &cfg)
            .unwrap();
        assert!(!below.triggered);
    }

    #[test]
    fn high_deposit_ignores_withdrawals() {
        let cfg = RuleThresholds::default();
        let outcome = HighDepositRule
            .evaluate(
                &txn(TransactionType::Withdrawal, 50_000.0),
                &account(),
                &StubHistory::default(),
                &cfg,
            )
            .unwrap();
        assert!(!outcome.triggered);
    }

    #[test]
    fn negligible_profit_needs_a_prior_buy() {
        let cfg = RuleThresholds::default();
        let sell = txn(TransactionType::TradeSell, 500.0);

        let no_buy = NegligibleProfitRule
            .evaluate(&sell, &account(), &StubHistory::default(), &cfg)
            .unwrap();
        assert!(!no_buy.triggered, "no prior buy must not trigger");

        let history = StubHistory {
            prior_buy: Some(txn(TransactionType::TradeBuy, 499.5)),
            ..Default::default()
        };
        let with_buy = NegligibleProfitRule
            .evaluate(&sell, &account(), &history, &cfg)
            .unwrap();
        assert!(with_buy.triggered, "|500 - 499.5| <= 1.0 must trigger");
    }

    #[test]
    fn negligible_profit_respects_threshold() {
        let cfg = RuleThresholds::default();
        let history = StubHistory {
            prior_buy: Some(txn(TransactionType::TradeBuy, 490.0)),
            ..Default::default()
        };
        let outcome = NegligibleProfitRule
            .evaluate(&txn(TransactionType::TradeSell, 500.0), &account(), &history, &cfg)
            .unwrap();
        assert!(!outcome.triggered, "profit 10.0 > threshold 1.0");
    }

    #[test]
    fn rapid_cycle_triggers_on_recent_deposit() {
        let cfg = RuleThresholds::default();
        let history = StubHistory {
            deposit_in_window: true,
            ..Default::default()
        };
        let outcome = RapidCycleRule
            .evaluate(&txn(TransactionType::Withdrawal, 100.0), &account(), &history, &cfg)
            .unwrap();
        assert!(outcome.triggered);
        assert_eq!(outcome.severity, Severity::Medium);
    }

    #[test]
    fn velocity_boundary_is_inclusive() {
        let cfg = RuleThresholds::default();

        let at = StubHistory {
            txn_count: 5,
            ..Default::default()
        };
        assert!(VelocityRule
            .evaluate(&txn(TransactionType::Deposit, 10.0), &account(), &at, &cfg)
            .unwrap()
            .triggered);

        let below = StubHistory {
            txn_count: 4,
            ..Default::default()
        };
        assert!(!VelocityRule
            .evaluate(&txn(TransactionType::Deposit, 10.0), &account(), &below, &cfg)
            .unwrap()
            .triggered);
    }

    #[test]
    fn cross_border_compares_source_against_residency() {
        let cfg = RuleThresholds::default();
        let history = StubHistory {
            residency: Some("US".into()),
            ..Default::default()
        };

        let mut foreign = txn(TransactionType::Deposit, 100.0);
        foreign.deposit_source_country = Some("PA".into());
        assert!(CrossBorderRule
            .evaluate(&foreign, &account(), &history, &cfg)
            .unwrap()
            .triggered);

        let mut domestic = txn(TransactionType::Deposit, 100.0);
        domestic.deposit_source_country = Some("US".into());
        assert!(!CrossBorderRule
            .evaluate(&domestic, &account(), &history, &cfg)
            .unwrap()
            .triggered);

        // Missing or empty source country never triggers.
        let mut blank = txn(TransactionType::Deposit, 100.0);
        blank.deposit_source_country = Some(String::new());
        assert!(!CrossBorderRule
            .evaluate(&blank, &account(), &history, &cfg)
            .unwrap()
            .triggered);
    }

    #[test]
    fn high_risk_account_reads_active_flag() {
        let cfg = RuleThresholds::default();
        let flagged = StubHistory {
            high_risk: true,
            ..Default::default()
        };
        assert!(HighRiskAccountRule
            .evaluate(&txn(TransactionType::Deposit, 10.0), &account(), &flagged, &cfg)
            .unwrap()
            .triggered);

        assert!(!HighRiskAccountRule
            .evaluate(
                &txn(TransactionType::Deposit, 10.0),
                &account(),
                &StubHistory::default(),
                &cfg
            )
            .unwrap()
            .triggered);
    }
}
