//! Case adjudication.
//!
//! RULES:
//!   - OPEN and ACCEPTED cases take decisions; CLOSE is terminal.
//!   - ACCEPT confirms the suspicion and keeps the hold in place.
//!   - REJECT overturns it: the case closes and the held transaction is
//!     released (completed, balance applied) in the same write transaction.
//!   - Every decision is recorded in the audit trail, including decisions
//!     on cases that later close.

use crate::{
    error::{self, AmlError, AmlResult},
    store::AmlStore,
    types::{
        Case, CaseDecision, CaseDocument, CaseStatus, DecisionKind, TransactionStatus,
    },
};
use chrono::Utc;

/// What to record when the next decision is not stated by the analyst.
pub const DEFAULT_NEXT_ACTION: &str = "close-case";

#[derive(Debug, Clone)]
pub struct DecisionRequest {
    pub case_id: String,
    pub decision: DecisionKind,
    pub decision_by: String,
    pub decision_reason: String,
    pub next_action: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub case: Case,
    pub decision: CaseDecision,
}

/// Map a raw decision string to a kind, rejecting anything outside the
/// two-verb vocabulary.
pub fn parse_decision(raw: &str) -> AmlResult<DecisionKind> {
    DecisionKind::parse(raw).ok_or_else(|| {
        AmlError::validation(
            error::CASE_INVALID_DECISION,
            format!("decision must be ACCEPT or REJECT, got '{raw}'"),
        )
    })
}

/// Apply one analyst decision to a case.
pub fn decide(store: &AmlStore, req: &DecisionRequest) -> AmlResult<DecisionOutcome> {
    store.with_tx(|store| {
        let mut case = store
            .get_case(&req.case_id)?
            .ok_or_else(|| AmlError::not_found("case", req.case_id.clone()))?;

        if case.case_status == CaseStatus::Close {
            return Err(AmlError::conflict(
                error::CASE_ALREADY_CLOSED,
                format!("case {} is already closed", case.case_id),
            ));
        }

        // First decision claims the case for the deciding analyst.
        if case.assigned_to.is_none() {
            case.assigned_to = Some(req.decision_by.clone());
            case.assigned_date = Some(Utc::now());
        }

        match req.decision {
            DecisionKind::Accept => {
                case.case_status = CaseStatus::Accepted;
                log::info!("case {} accepted by {}", case.case_id, req.decision_by);
            }
            DecisionKind::Reject => {
                case.case_status = CaseStatus::Close;
                case.case_closed_date = Some(Utc::now());
                release_held_transaction(store, &case)?;
                log::info!("case {} rejected and closed by {}", case.case_id, req.decision_by);
            }
        }
        store.update_case(&case)?;

        let decision = store.insert_decision(&CaseDecision {
            id: None,
            case_id: case.case_id.clone(),
            decision: req.decision,
            decision_by: req.decision_by.clone(),
            decision_date: Utc::now(),
            decision_reason: req.decision_reason.clone(),
            next_action: req
                .next_action
                .clone()
                .unwrap_or_else(|| DEFAULT_NEXT_ACTION.to_string()),
        })?;

        Ok(DecisionOutcome { case, decision })
    })
}

/// Complete the case's held transaction and apply its balance effect.
/// No-op when the case has no transaction or it is not held.
fn release_held_transaction(store: &AmlStore, case: &Case) -> AmlResult<()> {
    let Some(txn_id) = &case.transaction_id else {
        return Ok(());
    };
    let txn = store
        .get_transaction(txn_id)?
        .ok_or_else(|| AmlError::not_found("transaction", txn_id.clone()))?;
    if txn.transaction_status != TransactionStatus::Held {
        return Ok(());
    }
    store.update_transaction_status(&txn.transaction_id, TransactionStatus::Completed)?;
    store.apply_balance_delta(
        &txn.account_number,
        txn.transaction_type.balance_delta(txn.transaction_amount),
    )?;
    log::info!(
        "released held transaction {} for case {}",
        txn.transaction_id,
        case.case_id
    );
    Ok(())
}

/// Latest SAR draft generated for a case, if the document stage produced one.
pub fn sar_draft(store: &AmlStore, case_id: &str) -> AmlResult<Option<CaseDocument>> {
    store.latest_document(case_id, "sar_draft")
}
