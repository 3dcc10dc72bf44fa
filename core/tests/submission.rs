//! Transaction submission lifecycle tests: validation, screening, and the
//! completed/held split.

use chrono::{Duration, TimeZone, Utc};
use regulus_core::{
    config::AmlConfig,
    engine::AmlEngine,
    error::{self, AmlError},
    store::AmlStore,
    transaction_service::TransactionRequest,
    types::{new_id, Account, CaseStatus, Customer, TransactionStatus, TransactionType},
};

fn build() -> AmlEngine {
    let store = AmlStore::in_memory().expect("open in-memory store");
    store.migrate().expect("migrate");
    AmlEngine::new(store, AmlConfig::default()).expect("build engine")
}

fn seed_account(engine: &AmlEngine, balance: f64, residency: &str) -> String {
    let customer_id = new_id("CUST");
    engine
        .store
        .insert_customer(&Customer {
            customer_id: customer_id.clone(),
            customer_type: "individual".into(),
            full_name: "Test Customer".into(),
            nationality: residency.into(),
            residency_country: residency.into(),
            kyc_status: "verified".into(),
            risk_rating: "low".into(),
        })
        .unwrap();
    let account_number = new_id("ACC");
    engine
        .store
        .insert_account(&Account {
            account_number: account_number.clone(),
            customer_id,
            account_type: "checking".into(),
            account_status: "active".into(),
            branch_code: "BR-001".into(),
            balance_amount: balance,
            balance_currency: "USD".into(),
            opened_date: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        })
        .unwrap();
    account_number
}

fn request(account: &str, kind: TransactionType, amount: f64) -> TransactionRequest {
    TransactionRequest {
        account_number: account.to_string(),
        transaction_amount: amount,
        transaction_currency: "USD".into(),
        transaction_type: kind,
        transaction_date: None,
        purpose: None,
        deposit_source_type: None,
        deposit_source_value: None,
        deposit_source_country: Some("US".into()),
    }
}

/// A small domestic deposit completes immediately and credits the balance.
#[test]
fn clean_deposit_completes_and_credits() {
    let engine = build();
    let acc = seed_account(&engine, 1_000.0, "US");

    let outcome = engine
        .submit_transaction(&request(&acc, TransactionType::Deposit, 500.0))
        .unwrap();

    assert_eq!(outcome.transaction.transaction_status, TransactionStatus::Completed);
    assert!(outcome.alerts.is_empty());
    assert!(outcome.case.is_none());
    assert_eq!(engine.store.account_balance(&acc).unwrap(), 1_500.0);

    let stored = engine
        .transaction(&outcome.transaction.transaction_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.transaction_status, TransactionStatus::Completed);
}

/// A deposit at the threshold is held: no balance effect, one High Deposit
/// alert, a high-risk flag, and an open case.
#[test]
fn large_deposit_is_held_with_case() {
    let engine = build();
    let acc = seed_account(&engine, 1_000.0, "US");

    let outcome = engine
        .submit_transaction(&request(&acc, TransactionType::Deposit, 50_000.0))
        .unwrap();

    assert_eq!(outcome.transaction.transaction_status, TransactionStatus::Held);
    assert_eq!(engine.store.account_balance(&acc).unwrap(), 1_000.0, "hold has no balance effect");

    assert_eq!(outcome.alerts.len(), 1);
    assert_eq!(outcome.alerts[0].rule_id, "RULE-01");
    assert!(engine.store.has_active_high_risk_flag(&acc).unwrap());

    let case = outcome.case.expect("held transaction opens a case");
    assert_eq!(case.case_status, CaseStatus::Open);
    assert_eq!(case.alert_id, outcome.alerts[0].alert_id);
    assert_eq!(
        case.transaction_id.as_deref(),
        Some(outcome.transaction.transaction_id.as_str())
    );
}

/// Withdrawal shortly after a deposit trips the rapid-cycle rule but not
/// velocity (only two transactions in the window).
#[test]
fn withdrawal_after_deposit_trips_rapid_cycle_only() {
    let engine = build();
    let acc = seed_account(&engine, 1_000.0, "US");
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let mut dep = request(&acc, TransactionType::Deposit, 500.0);
    dep.transaction_date = Some(base);
    let dep_outcome = engine.submit_transaction(&dep).unwrap();
    assert!(!dep_outcome.is_held());

    let mut wd = request(&acc, TransactionType::Withdrawal, 100.0);
    wd.transaction_date = Some(base + Duration::hours(2));
    let outcome = engine.submit_transaction(&wd).unwrap();

    assert!(outcome.is_held());
    let rule_ids: Vec<&str> = outcome.alerts.iter().map(|a| a.rule_id.as_str()).collect();
    assert_eq!(rule_ids, vec!["RULE-03"]);
}

/// The fifth transaction inside the velocity window trips the rule;
/// the first four stay clean.
#[test]
fn velocity_counts_the_current_transaction() {
    let engine = build();
    let acc = seed_account(&engine, 1_000.0, "US");
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    for i in 0..4 {
        let mut req = request(&acc, TransactionType::Deposit, 10.0);
        req.transaction_date = Some(base + Duration::minutes(i));
        let outcome = engine.submit_transaction(&req).unwrap();
        assert!(!outcome.is_held(), "transaction {} should be clean", i + 1);
    }

    let mut fifth = request(&acc, TransactionType::Deposit, 10.0);
    fifth.transaction_date = Some(base + Duration::minutes(4));
    let outcome = engine.submit_transaction(&fifth).unwrap();

    assert!(outcome.is_held());
    assert_eq!(outcome.alerts[0].rule_id, "RULE-04");
}

/// A cross-border deposit (source country differs from residency) is held.
#[test]
fn cross_border_deposit_is_held() {
    let engine = build();
    let acc = seed_account(&engine, 1_000.0, "US");

    let mut req = request(&acc, TransactionType::Deposit, 200.0);
    req.deposit_source_country = Some("PA".into());
    let outcome = engine.submit_transaction(&req).unwrap();

    assert!(outcome.is_held());
    assert_eq!(outcome.alerts[0].rule_id, "RULE-05");
}

/// Once an account is flagged high-risk, even small clean-looking
/// transactions are held by the high-risk-account rule.
#[test]
fn flagged_account_holds_subsequent_transactions() {
    let engine = build();
    let acc = seed_account(&engine, 1_000.0, "US");

    engine
        .submit_transaction(&request(&acc, TransactionType::Deposit, 50_000.0))
        .unwrap();

    let outcome = engine
        .submit_transaction(&request(&acc, TransactionType::Deposit, 25.0))
        .unwrap();
    assert!(outcome.is_held());
    assert!(outcome.alerts.iter().any(|a| a.rule_id == "RULE-06"));
}

/// When several rules of equal severity fire, the first in rule order
/// drives the case.
#[test]
fn primary_alert_is_first_of_equal_severity() {
    let engine = build();
    let acc = seed_account(&engine, 1_000.0, "US");

    // Triggers both High Deposit (RULE-01) and Cross-Border (RULE-05), both high.
    let mut req = request(&acc, TransactionType::Deposit, 50_000.0);
    req.deposit_source_country = Some("PA".into());
    let outcome = engine.submit_transaction(&req).unwrap();

    assert_eq!(outcome.alerts.len(), 2);
    let case = outcome.case.unwrap();
    let primary = outcome
        .alerts
        .iter()
        .find(|a| a.alert_id == case.alert_id)
        .unwrap();
    assert_eq!(primary.rule_id, "RULE-01");
}

/// Submissions against unknown accounts fail without persisting anything.
#[test]
fn unknown_account_is_rejected() {
    let engine = build();
    let err = engine
        .submit_transaction(&request("ACC-DOESNOTEXIST", TransactionType::Deposit, 100.0))
        .unwrap_err();
    assert!(matches!(err, AmlError::NotFound { entity: "account", .. }));
    assert_eq!(engine.store.count_transactions(None, None, None).unwrap(), 0);
}

/// Amounts must be strictly positive.
#[test]
fn non_positive_amount_is_rejected() {
    let engine = build();
    let acc = seed_account(&engine, 1_000.0, "US");

    for bad in [0.0, -50.0] {
        let err = engine
            .submit_transaction(&request(&acc, TransactionType::Deposit, bad))
            .unwrap_err();
        assert!(matches!(
            err,
            AmlError::Validation { code, .. } if code == error::TRANSACTION_INVALID_AMOUNT
        ));
    }
    assert_eq!(engine.store.count_transactions(None, None, None).unwrap(), 0);
}

/// Debits beyond the balance are rejected before screening.
#[test]
fn insufficient_balance_is_rejected() {
    let engine = build();
    let acc = seed_account(&engine, 100.0, "US");

    let err = engine
        .submit_transaction(&request(&acc, TransactionType::Withdrawal, 500.0))
        .unwrap_err();
    assert!(matches!(
        err,
        AmlError::Validation { code, .. } if code == error::ACCOUNT_INSUFFICIENT_BALANCE
    ));
    assert_eq!(engine.store.account_balance(&acc).unwrap(), 100.0);
}

/// Trade sells at roughly the prior buy price are held as wash-style trades.
#[test]
fn negligible_profit_sell_is_held() {
    let engine = build();
    let acc = seed_account(&engine, 10_000.0, "US");
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let mut buy = request(&acc, TransactionType::TradeBuy, 500.0);
    buy.transaction_date = Some(base);
    assert!(!engine.submit_transaction(&buy).unwrap().is_held());

    let mut sell = request(&acc, TransactionType::TradeSell, 500.5);
    sell.transaction_date = Some(base + Duration::days(2));
    let outcome = engine.submit_transaction(&sell).unwrap();

    assert!(outcome.is_held());
    assert_eq!(outcome.alerts[0].rule_id, "RULE-02");
}
