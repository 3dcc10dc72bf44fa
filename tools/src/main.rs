//! aml-runner: headless demo runner for the screening engine.
//!
//! Usage:
//!   aml-runner --db run.db
//!   aml-runner --config cfg.json --analyst jdoe

use anyhow::Result;
use chrono::Utc;
use regulus_core::{
    case_service::DecisionRequest,
    config::AmlConfig,
    engine::AmlEngine,
    store::AmlStore,
    transaction_service::TransactionRequest,
    types::{new_id, Account, Customer, DecisionKind, TransactionType},
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let analyst = flag_value(&args, "--analyst").unwrap_or("demo-analyst");
    let config = match flag_value(&args, "--config") {
        Some(path) => AmlConfig::load(path)?,
        None => AmlConfig::default(),
    };

    println!("aml-runner");
    println!("  db:      {db}");
    println!("  analyst: {analyst}");
    println!();

    let store = AmlStore::open(db)?;
    store.migrate()?;
    let engine = AmlEngine::new(store, config)?;

    let account_number = seed_demo_account(&engine)?;

    // A clean deposit settles immediately.
    let clean = engine.submit_transaction(&deposit(&account_number, 500.0))?;
    println!(
        "clean deposit:  {} -> {}",
        clean.transaction.transaction_id,
        clean.transaction.transaction_status.as_str()
    );

    // A structuring-sized deposit is held and spawns a case.
    let flagged = engine.submit_transaction(&deposit(&account_number, 50_000.0))?;
    println!(
        "large deposit:  {} -> {} ({} alert(s))",
        flagged.transaction.transaction_id,
        flagged.transaction.transaction_status.as_str(),
        flagged.alerts.len()
    );

    let case = flagged
        .case
        .ok_or_else(|| anyhow::anyhow!("held transaction produced no case"))?;
    println!(
        "case opened:    {} score={} classification={}",
        case.case_id,
        case.case_score,
        case.classification.as_str()
    );
    if let Some(doc) = engine.sar_draft(&case.case_id)? {
        println!("sar draft:      {} v{}", doc.document_id, doc.version);
    }

    // The analyst overturns it; the hold is released.
    let outcome = engine.decide_case(&DecisionRequest {
        case_id: case.case_id.clone(),
        decision: DecisionKind::Reject,
        decision_by: analyst.to_string(),
        decision_reason: "Documented source of funds".into(),
        next_action: None,
    })?;
    println!(
        "decision:       {} -> {}",
        outcome.decision.decision.as_str(),
        outcome.case.case_status.as_str()
    );

    let released = engine
        .transaction(&flagged.transaction.transaction_id)?
        .ok_or_else(|| anyhow::anyhow!("transaction vanished"))?;
    let balance = engine.store.account_balance(&account_number)?;
    println!();
    println!("=== RUN SUMMARY ===");
    println!("  released txn:  {}", released.transaction_status.as_str());
    println!("  balance:       {balance}");
    println!("  decisions:     {}", engine.decisions(&case.case_id)?.len());

    Ok(())
}

fn deposit(account_number: &str, amount: f64) -> TransactionRequest {
    TransactionRequest {
        account_number: account_number.to_string(),
        transaction_amount: amount,
        transaction_currency: "USD".into(),
        transaction_type: TransactionType::Deposit,
        transaction_date: None,
        purpose: Some("demo".into()),
        deposit_source_type: Some("wire".into()),
        deposit_source_value: Some("Demo Counterparty".into()),
        deposit_source_country: Some("US".into()),
    }
}

fn seed_demo_account(engine: &AmlEngine) -> Result<String> {
    let customer_id = new_id("CUST");
    engine.store.insert_customer(&Customer {
        customer_id: customer_id.clone(),
        customer_type: "individual".into(),
        full_name: "Demo Customer".into(),
        nationality: "US".into(),
        residency_country: "US".into(),
        kyc_status: "verified".into(),
        risk_rating: "low".into(),
    })?;

    let account_number = new_id("ACC");
    engine.store.insert_account(&Account {
        account_number: account_number.clone(),
        customer_id,
        account_type: "checking".into(),
        account_status: "active".into(),
        branch_code: "BR-001".into(),
        balance_amount: 1_000.0,
        balance_currency: "USD".into(),
        opened_date: Utc::now(),
    })?;
    Ok(account_number)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
