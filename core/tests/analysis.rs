//! Risk analysis pipeline tests: stage ordering, weighted aggregation,
//! neutral degradation, and the SAR draft document.

use chrono::Utc;
use regulus_core::{
    config::AmlConfig,
    engine::AmlEngine,
    scoring::{
        FailingScorer, ScoringBackend, ScriptedScorer, StageScore, NEUTRAL_SCORE,
        UNCONFIGURED_SUMMARY,
    },
    store::AmlStore,
    transaction_service::TransactionRequest,
    types::{new_id, Account, Case, Classification, Customer, TransactionType},
};

fn build(scorer: Box<dyn ScoringBackend>) -> AmlEngine {
    let store = AmlStore::in_memory().expect("open in-memory store");
    store.migrate().expect("migrate");
    AmlEngine::with_scorer(store, AmlConfig::default(), scorer)
}

fn seed_account(engine: &AmlEngine, balance: f64) -> String {
    let customer_id = new_id("CUST");
    engine
        .store
        .insert_customer(&Customer {
            customer_id: customer_id.clone(),
            customer_type: "individual".into(),
            full_name: "Test Customer".into(),
            nationality: "US".into(),
            residency_country: "US".into(),
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
            opened_date: Utc::now(),
        })
        .unwrap();
    account_number
}

/// Run one held deposit through the engine and return its case.
fn held_case(engine: &AmlEngine, account: &str) -> Case {
    engine
        .submit_transaction(&TransactionRequest {
            account_number: account.to_string(),
            transaction_amount: 50_000.0,
            transaction_currency: "USD".into(),
            transaction_type: TransactionType::Deposit,
            transaction_date: None,
            purpose: None,
            deposit_source_type: None,
            deposit_source_value: None,
            deposit_source_country: Some("US".into()),
        })
        .unwrap()
        .case
        .expect("large deposit must open a case")
}

/// Stage scores land in the case in pipeline order, the aggregate follows
/// the fixed weights, and the sixth response becomes the SAR draft.
#[test]
fn scripted_stages_fill_the_case_in_order() {
    let scorer = ScriptedScorer::new([
        StageScore::new(80.0, "behavioral findings"),
        StageScore::new(60.0, "network findings"),
        StageScore::new(40.0, "contextual findings"),
        StageScore::new(20.0, "evidence findings"),
        StageScore::new(100.0, "unlikely false positive"),
        StageScore::new(0.0, "SAR narrative text"),
    ]);
    let engine = build(Box::new(scorer));
    let acc = seed_account(&engine, 1_000.0);
    let case = held_case(&engine, &acc);

    assert_eq!(case.behavioral_score, 80.0);
    assert_eq!(case.behavioral_summary, "behavioral findings");
    assert_eq!(case.network_score, 60.0);
    assert_eq!(case.contextual_score, 40.0);
    assert_eq!(case.evidence_score, 20.0);
    assert_eq!(case.false_positive_score, 100.0);

    // 0.25*80 + 0.20*60 + 0.20*40 + 0.20*20 + 0.15*100 = 59.0
    assert_eq!(case.case_score, 59.0);
    assert_eq!(case.classification, Classification::Medium);
    assert_eq!(
        case.case_summary,
        "Classification: medium. Behavioral: behavioral findings. Network: network findings. \
         Contextual: contextual findings. Evidence: evidence findings."
    );

    let draft = engine.sar_draft(&case.case_id).unwrap().unwrap();
    assert_eq!(draft.content, "SAR narrative text");
    assert_eq!(draft.content_type, "sar_draft");
    assert_eq!(draft.version, 1);
}

/// Uniformly low stage scores classify as false positive, uniformly high
/// ones as high.
#[test]
fn classification_follows_the_aggregate() {
    let low_engine = build(Box::new(ScriptedScorer::constant(10.0, "quiet")));
    let acc = seed_account(&low_engine, 1_000.0);
    let case = held_case(&low_engine, &acc);
    assert_eq!(case.case_score, 10.0);
    assert_eq!(case.classification, Classification::FalsePositive);

    let high_engine = build(Box::new(ScriptedScorer::constant(90.0, "loud")));
    let acc = seed_account(&high_engine, 1_000.0);
    let case = held_case(&high_engine, &acc);
    assert_eq!(case.case_score, 90.0);
    assert_eq!(case.classification, Classification::High);
}

/// Without a configured backend every stage is neutral 50, which still
/// yields a complete, adjudicable case.
#[test]
fn unconfigured_backend_yields_neutral_case() {
    let store = AmlStore::in_memory().unwrap();
    store.migrate().unwrap();
    let engine = AmlEngine::new(store, AmlConfig::default()).unwrap();
    let acc = seed_account(&engine, 1_000.0);
    let case = held_case(&engine, &acc);

    for score in [
        case.behavioral_score,
        case.network_score,
        case.contextual_score,
        case.evidence_score,
        case.false_positive_score,
    ] {
        assert_eq!(score, NEUTRAL_SCORE);
    }
    assert_eq!(case.case_score, NEUTRAL_SCORE);
    assert_eq!(case.classification, Classification::Medium);
    assert_eq!(case.behavioral_summary, UNCONFIGURED_SUMMARY);
}

/// A backend that errors on every call degrades each stage to neutral
/// instead of failing the submission.
#[test]
fn failing_backend_degrades_without_aborting() {
    let engine = build(Box::new(FailingScorer));
    let acc = seed_account(&engine, 1_000.0);
    let case = held_case(&engine, &acc);

    assert_eq!(case.case_score, NEUTRAL_SCORE);
    assert_eq!(case.classification, Classification::Medium);

    // The document stage degrades the same way.
    let draft = engine.sar_draft(&case.case_id).unwrap().unwrap();
    assert_eq!(draft.content, UNCONFIGURED_SUMMARY);
}
