//! Risk analysis pipeline: five sequential scoring stages, a weighted
//! finalizer, and a narrative document stage.
//!
//! The original workflow was a graph of nodes sharing a mutable mapping;
//! here it is an explicit ordered fold over [`AnalysisState`] because the
//! dependency order is fixed and never branches. Later stages consume the
//! summaries of earlier ones, so stages must not run concurrently.

use crate::{
    config::{AmlConfig, StageWeights},
    error::{AmlError, AmlResult},
    scoring::{ScoringBackend, StageScore},
    store::AmlStore,
    types::{
        new_id, Account, Alert, Case, CaseDocument, CaseStatus, Classification, Customer,
        HighRiskFlag, Transaction,
    },
};
use chrono::Utc;
use serde::Serialize;

/// Pipeline-scoped context. Built once per run from the primary alert,
/// accumulated stage by stage, discarded after the case is created.
pub struct AnalysisState {
    pub alert: Alert,
    pub account: Account,
    pub customer: Option<Customer>,
    pub current_transaction: Option<Transaction>,
    pub transaction_history: Vec<Transaction>,
    pub existing_alerts: Vec<Alert>,
    pub high_risk: Option<HighRiskFlag>,

    pub behavioral: Option<StageScore>,
    pub network: Option<StageScore>,
    pub contextual: Option<StageScore>,
    pub evidence: Option<StageScore>,
    pub false_positive: Option<StageScore>,
}

impl AnalysisState {
    fn score_of(stage: &Option<StageScore>) -> f64 {
        stage.as_ref().map(|s| s.score).unwrap_or(0.0)
    }

    fn summary_of(stage: &Option<StageScore>) -> &str {
        stage.as_ref().map(|s| s.summary.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct CaseVerdict {
    pub score: f64,
    pub classification: Classification,
    pub summary: String,
}

fn json_of(value: &impl Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
}

// ── Stage prompts ────────────────────────────────────────────────────────────

fn behavioral_prompt(state: &AnalysisState) -> String {
    format!(
        "You are a behavioral analyst. Analyze if the current transaction deviates \
         from historical behavior. Return a score 0-100 and a short summary.\n\n\
         Customer: {}\nAccount: {}\nCurrent transaction: {}\nTransaction history (recent): {}\n",
        json_of(&state.customer),
        json_of(&state.account),
        json_of(&state.current_transaction),
        json_of(&state.transaction_history),
    )
}

fn network_prompt(state: &AnalysisState) -> String {
    format!(
        "You are a network analyst. Look for relationships across accounts/devices/IPs \
         (if present). Return a score 0-100 and a short summary.\n\n\
         Account: {}\nExisting alerts: {}\nTransaction history (recent): {}\n",
        json_of(&state.account),
        json_of(&state.existing_alerts),
        json_of(&state.transaction_history),
    )
}

fn contextual_prompt(state: &AnalysisState) -> String {
    format!(
        "You are a contextual risk scorer. Assess holistic risk given KYC/risk rating \
         and transaction context. Return a score 0-100 and a short summary.\n\n\
         Customer: {}\nAccount: {}\nCurrent transaction: {}\nHigh risk info: {}\n",
        json_of(&state.customer),
        json_of(&state.account),
        json_of(&state.current_transaction),
        json_of(&state.high_risk),
    )
}

fn evidence_prompt(state: &AnalysisState) -> String {
    format!(
        "You are an evidence collector. Build an evidence summary and score suspicious \
         indicators. Return a score 0-100 and a concise summary.\n\n\
         Current transaction: {}\nExisting alerts: {}\nTransaction history (recent): {}\n\
         Behavioral summary: {}\nNetwork summary: {}\nContextual summary: {}\n",
        json_of(&state.current_transaction),
        json_of(&state.existing_alerts),
        json_of(&state.transaction_history),
        AnalysisState::summary_of(&state.behavioral),
        AnalysisState::summary_of(&state.network),
        AnalysisState::summary_of(&state.contextual),
    )
}

fn false_positive_prompt(state: &AnalysisState) -> String {
    format!(
        "You are a false positive optimizer. Given all prior analyses, estimate \
         likelihood of false positive. Return a score 0-100 (higher means less likely \
         false positive) and a short summary.\n\n\
         Behavioral score/summary: {} / {}\nNetwork score/summary: {} / {}\n\
         Contextual score/summary: {} / {}\nEvidence score/summary: {} / {}\n\
         High risk info: {}\n",
        AnalysisState::score_of(&state.behavioral),
        AnalysisState::summary_of(&state.behavioral),
        AnalysisState::score_of(&state.network),
        AnalysisState::summary_of(&state.network),
        AnalysisState::score_of(&state.contextual),
        AnalysisState::summary_of(&state.contextual),
        AnalysisState::score_of(&state.evidence),
        AnalysisState::summary_of(&state.evidence),
        json_of(&state.high_risk),
    )
}

fn document_prompt(state: &AnalysisState, verdict: &CaseVerdict) -> String {
    format!(
        "You are a SAR document generator. Produce a concise narrative suitable for a \
         SAR draft. Use the case summary and evidence.\n\n\
         Case summary: {}\nBehavioral: {}\nNetwork: {}\nContextual: {}\nEvidence: {}\n\
         False positive: {}\n",
        verdict.summary,
        AnalysisState::summary_of(&state.behavioral),
        AnalysisState::summary_of(&state.network),
        AnalysisState::summary_of(&state.contextual),
        AnalysisState::summary_of(&state.evidence),
        AnalysisState::summary_of(&state.false_positive),
    )
}

/// Run one stage, degrading to the neutral score when the backend errors so
/// a scoring outage never corrupts the held transaction.
fn run_stage(scorer: &dyn ScoringBackend, name: &str, prompt: &str) -> StageScore {
    match scorer.invoke(prompt) {
        Ok(result) => {
            let clamped = StageScore::new(result.score, result.summary);
            log::info!("stage {name} scored {}", clamped.score);
            clamped
        }
        Err(err) => {
            log::warn!("stage {name} scoring failed, using neutral fallback: {err}");
            StageScore::neutral()
        }
    }
}

// ── Finalizer ────────────────────────────────────────────────────────────────

/// Classification thresholds over the aggregate score (half-open ranges).
pub fn classify(score: f64) -> Classification {
    if score < 20.0 {
        Classification::FalsePositive
    } else if score < 50.0 {
        Classification::Low
    } else if score < 75.0 {
        Classification::Medium
    } else {
        Classification::High
    }
}

/// Weighted aggregate of the five stage scores; missing stages count as 0.
pub fn finalize(weights: &StageWeights, state: &AnalysisState) -> CaseVerdict {
    let score = AnalysisState::score_of(&state.behavioral) * weights.behavioral
        + AnalysisState::score_of(&state.network) * weights.network
        + AnalysisState::score_of(&state.contextual) * weights.contextual
        + AnalysisState::score_of(&state.evidence) * weights.evidence
        + AnalysisState::score_of(&state.false_positive) * weights.false_positive;
    let score = (score * 100.0).round() / 100.0;

    let classification = classify(score);
    let summary = format!(
        "Classification: {}. Behavioral: {}. Network: {}. Contextual: {}. Evidence: {}.",
        classification.as_str(),
        AnalysisState::summary_of(&state.behavioral),
        AnalysisState::summary_of(&state.network),
        AnalysisState::summary_of(&state.contextual),
        AnalysisState::summary_of(&state.evidence),
    );

    CaseVerdict {
        score,
        classification,
        summary,
    }
}

// ── Pipeline driver ──────────────────────────────────────────────────────────

/// Run the full analysis pipeline for one alert: fetch context, score the
/// five stages strictly in order, finalize, and persist the case plus its
/// version-1 narrative document. Callers wrap this in the submission's write
/// transaction so the case and document land atomically with the hold.
pub fn run_for_alert(
    store: &AmlStore,
    cfg: &AmlConfig,
    scorer: &dyn ScoringBackend,
    alert_id: &str,
) -> AmlResult<Case> {
    let alert = store
        .get_alert(alert_id)?
        .ok_or_else(|| AmlError::not_found("alert", alert_id))?;
    let account = store
        .get_account(&alert.account_number)?
        .ok_or_else(|| AmlError::not_found("account", alert.account_number.clone()))?;

    let mut state = AnalysisState {
        customer: store.get_customer(&account.customer_id)?,
        current_transaction: store.latest_transaction(&alert.account_number)?,
        transaction_history: store.transaction_history(&alert.account_number, cfg.history_limit)?,
        existing_alerts: store.alerts_for_account(&alert.account_number)?,
        high_risk: store.high_risk_flag(&alert.account_number)?,
        account,
        alert,
        behavioral: None,
        network: None,
        contextual: None,
        evidence: None,
        false_positive: None,
    };

    // Fixed stage order; each stage reads the summaries of the ones before it.
    state.behavioral = Some(run_stage(scorer, "behavioral", &behavioral_prompt(&state)));
    state.network = Some(run_stage(scorer, "network", &network_prompt(&state)));
    state.contextual = Some(run_stage(scorer, "contextual", &contextual_prompt(&state)));
    state.evidence = Some(run_stage(scorer, "evidence", &evidence_prompt(&state)));
    state.false_positive = Some(run_stage(
        scorer,
        "false_positive",
        &false_positive_prompt(&state),
    ));

    let verdict = finalize(&cfg.weights, &state);
    log::info!(
        "case finalized for alert {} score={} classification={}",
        state.alert.alert_id,
        verdict.score,
        verdict.classification.as_str()
    );

    let case = Case {
        case_id: new_id("CASE"),
        alert_id: state.alert.alert_id.clone(),
        account_number: state.alert.account_number.clone(),
        transaction_id: Some(state.alert.transaction_id.clone()),
        case_status: CaseStatus::Open,
        case_score: verdict.score,
        classification: verdict.classification,
        behavioral_score: AnalysisState::score_of(&state.behavioral),
        behavioral_summary: AnalysisState::summary_of(&state.behavioral).to_string(),
        network_score: AnalysisState::score_of(&state.network),
        network_summary: AnalysisState::summary_of(&state.network).to_string(),
        contextual_score: AnalysisState::score_of(&state.contextual),
        contextual_summary: AnalysisState::summary_of(&state.contextual).to_string(),
        evidence_score: AnalysisState::score_of(&state.evidence),
        evidence_summary: AnalysisState::summary_of(&state.evidence).to_string(),
        false_positive_score: AnalysisState::score_of(&state.false_positive),
        false_positive_summary: AnalysisState::summary_of(&state.false_positive).to_string(),
        assigned_to: None,
        assigned_date: None,
        case_opened_date: Utc::now(),
        case_closed_date: None,
        case_summary: verdict.summary.clone(),
    };
    store.insert_case(&case)?;

    let content = run_stage(scorer, "document", &document_prompt(&state, &verdict)).summary;
    store.insert_document(&CaseDocument {
        document_id: new_id("DOC"),
        case_id: case.case_id.clone(),
        content_type: "sar_draft".into(),
        content,
        generated_by: "document_stage".into(),
        version: 1,
    })?;

    Ok(case)
}
