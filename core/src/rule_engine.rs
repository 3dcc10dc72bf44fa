//! Rule engine: runs the detection rules in fixed order against one
//! transaction and materializes every triggered outcome as an alert.
//!
//! RULES:
//!   - Evaluation order is fixed and never reordered; it is the tie-break
//!     for primary-alert selection downstream.
//!   - Rules are read-only and independent; one rule's outcome never feeds
//!     another's.
//!   - A rule evaluation error aborts the whole submission (fail-closed);
//!     it is never downgraded to "no alert".

use crate::{
    config::RuleThresholds,
    error::AmlResult,
    rules::{
        CrossBorderRule, HighDepositRule, HighRiskAccountRule, NegligibleProfitRule,
        RapidCycleRule, Rule, VelocityRule,
    },
    store::AmlStore,
    types::{new_id, Account, Alert, Transaction},
};
use chrono::Utc;

pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(HighDepositRule),
                Box::new(NegligibleProfitRule),
                Box::new(RapidCycleRule),
                Box::new(VelocityRule),
                Box::new(CrossBorderRule),
                Box::new(HighRiskAccountRule),
            ],
        }
    }

    /// Evaluate all rules against one transaction/account snapshot,
    /// persisting an alert per triggered rule. Returns alerts in rule order.
    pub fn evaluate(
        &self,
        store: &AmlStore,
        cfg: &RuleThresholds,
        txn: &Transaction,
        account: &Account,
    ) -> AmlResult<Vec<Alert>> {
        let mut alerts = Vec::new();
        for rule in &self.rules {
            let outcome = rule.evaluate(txn, account, store, cfg)?;
            if !outcome.triggered {
                log::debug!("rule {} not triggered txn={}", rule.rule_id(), txn.transaction_id);
                continue;
            }
            log::info!(
                "rule {} ({}) triggered txn={} severity={}",
                outcome.rule_id,
                outcome.rule_name,
                txn.transaction_id,
                outcome.severity.as_str()
            );
            let alert = Alert {
                alert_id: new_id("ALERT"),
                account_number: txn.account_number.clone(),
                transaction_id: txn.transaction_id.clone(),
                alert_type: outcome.rule_name.to_string(),
                severity: outcome.severity,
                rule_id: outcome.rule_id.to_string(),
                description: outcome.description,
                triggered_date: Utc::now(),
            };
            store.insert_alert(&alert)?;
            alerts.push(alert);
        }
        Ok(alerts)
    }
}
