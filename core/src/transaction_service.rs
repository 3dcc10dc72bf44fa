//! Transaction submission lifecycle.
//!
//! RULES:
//!   - Every transaction lands as `pending`, is screened, and leaves the
//!     submission as exactly one of `completed` or `held`.
//!   - The balance changes only when a transaction completes; a held
//!     transaction has no balance effect until its case is rejected.
//!   - The whole submission runs in one write transaction: a failure
//!     anywhere (including rule evaluation) rolls back everything.

use crate::{
    config::AmlConfig,
    error::{self, AmlError, AmlResult},
    pipeline,
    rule_engine::RuleEngine,
    scoring::ScoringBackend,
    store::AmlStore,
    types::{
        new_id, Alert, Case, HighRiskFlag, Transaction, TransactionStatus, TransactionType,
    },
};
use chrono::{DateTime, Utc};

/// Caller-supplied fields of a new transaction; everything else is assigned
/// during submission.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub account_number: String,
    pub transaction_amount: f64,
    pub transaction_currency: String,
    pub transaction_type: TransactionType,
    /// Defaults to now; tests backdate it to build histories.
    pub transaction_date: Option<DateTime<Utc>>,
    pub purpose: Option<String>,
    pub deposit_source_type: Option<String>,
    pub deposit_source_value: Option<String>,
    pub deposit_source_country: Option<String>,
}

/// Everything one submission produced.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub transaction: Transaction,
    pub alerts: Vec<Alert>,
    pub case: Option<Case>,
}

impl SubmissionOutcome {
    pub fn is_held(&self) -> bool {
        self.transaction.transaction_status == TransactionStatus::Held
    }
}

/// Pick the alert that drives the case: most severe wins, first-triggered
/// (rule order) breaks ties.
fn primary_alert(alerts: &[Alert]) -> Option<&Alert> {
    alerts.iter().min_by_key(|a| a.severity.rank())
}

/// Map a raw transaction type string to the enum, rejecting anything outside
/// the four allowed values.
pub fn parse_transaction_type(raw: &str) -> AmlResult<TransactionType> {
    TransactionType::parse(raw).ok_or_else(|| {
        AmlError::validation(
            error::TRANSACTION_INVALID_TYPE,
            format!("transaction type must be one of deposit/withdrawal/trade-buy/trade-sell, got '{raw}'"),
        )
    })
}

fn validate(store: &AmlStore, req: &TransactionRequest) -> AmlResult<()> {
    let account = store
        .get_account(&req.account_number)?
        .ok_or_else(|| AmlError::not_found("account", req.account_number.clone()))?;

    if !(req.transaction_amount > 0.0) {
        return Err(AmlError::validation(
            error::TRANSACTION_INVALID_AMOUNT,
            format!("transaction amount must be positive, got {}", req.transaction_amount),
        ));
    }

    if req.transaction_type.is_debit() && account.balance_amount < req.transaction_amount {
        return Err(AmlError::validation(
            error::ACCOUNT_INSUFFICIENT_BALANCE,
            format!(
                "balance {} is insufficient for {} of {}",
                account.balance_amount,
                req.transaction_type.as_str(),
                req.transaction_amount
            ),
        ));
    }

    Ok(())
}

/// Submit one transaction: validate, persist as pending, screen, then settle
/// as completed (with balance effect) or held (with high-risk flag and case).
pub fn submit(
    store: &AmlStore,
    cfg: &AmlConfig,
    engine: &RuleEngine,
    scorer: &dyn ScoringBackend,
    req: &TransactionRequest,
) -> AmlResult<SubmissionOutcome> {
    store.with_tx(|store| {
        validate(store, req)?;

        let txn = Transaction {
            transaction_id: new_id("TXN"),
            account_number: req.account_number.clone(),
            transaction_amount: req.transaction_amount,
            transaction_currency: req.transaction_currency.clone(),
            transaction_date: req.transaction_date.unwrap_or_else(Utc::now),
            transaction_type: req.transaction_type,
            transaction_status: TransactionStatus::Pending,
            purpose: req.purpose.clone(),
            deposit_source_type: req.deposit_source_type.clone(),
            deposit_source_value: req.deposit_source_value.clone(),
            deposit_source_country: req.deposit_source_country.clone(),
        };
        store.insert_transaction(&txn)?;

        // Re-read so the snapshot the rules see matches what is persisted.
        let account = store
            .get_account(&req.account_number)?
            .ok_or_else(|| AmlError::not_found("account", req.account_number.clone()))?;

        let alerts = engine.evaluate(store, &cfg.rules, &txn, &account)?;

        if alerts.is_empty() {
            store.update_transaction_status(&txn.transaction_id, TransactionStatus::Completed)?;
            store.apply_balance_delta(
                &txn.account_number,
                txn.transaction_type.balance_delta(txn.transaction_amount),
            )?;
            log::info!(
                "transaction {} completed clean, amount {}",
                txn.transaction_id,
                txn.transaction_amount
            );
            let mut completed = txn;
            completed.transaction_status = TransactionStatus::Completed;
            return Ok(SubmissionOutcome {
                transaction: completed,
                alerts,
                case: None,
            });
        }

        store.update_transaction_status(&txn.transaction_id, TransactionStatus::Held)?;

        if !store.has_active_high_risk_flag(&txn.account_number)? {
            store.insert_high_risk_flag(&HighRiskFlag {
                account_number: txn.account_number.clone(),
                high_risk_flag: 1,
                overall_risk_score: 80,
                risk_source: "rules_engine".into(),
                risk_reason: "Triggered AML rules".into(),
                detected_date: Utc::now(),
            })?;
        }

        let primary = primary_alert(&alerts)
            .ok_or_else(|| AmlError::not_found("alert", txn.transaction_id.clone()))?;
        log::info!(
            "transaction {} held, {} alert(s), primary {} ({})",
            txn.transaction_id,
            alerts.len(),
            primary.alert_id,
            primary.severity.as_str()
        );

        let case = pipeline::run_for_alert(store, cfg, scorer, &primary.alert_id)?;

        let mut held = txn;
        held.transaction_status = TransactionStatus::Held;
        Ok(SubmissionOutcome {
            transaction: held,
            alerts,
            case: Some(case),
        })
    })
}
