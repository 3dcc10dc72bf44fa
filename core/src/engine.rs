//! Engine facade tying the store, rule engine, and scoring backend together.
//! Embedders construct one [`AmlEngine`] and drive submissions and
//! adjudications through it.

use crate::{
    case_service::{self, DecisionOutcome, DecisionRequest},
    config::AmlConfig,
    error::AmlResult,
    rule_engine::RuleEngine,
    scoring::{backend_for_provider, ScoringBackend},
    store::AmlStore,
    transaction_service::{self, SubmissionOutcome, TransactionRequest},
    types::{
        Alert, Case, CaseDecision, CaseDocument, CaseStatus, Transaction, TransactionStatus,
        TransactionType,
    },
};

pub struct AmlEngine {
    pub store: AmlStore,
    config: AmlConfig,
    rules: RuleEngine,
    scorer: Box<dyn ScoringBackend>,
}

impl AmlEngine {
    /// Build an engine with the backend named by the configuration.
    /// An unknown scoring provider fails here, before any work is accepted.
    pub fn new(store: AmlStore, config: AmlConfig) -> AmlResult<Self> {
        let scorer = backend_for_provider(&config.scoring_provider)?;
        Ok(Self::with_scorer(store, config, scorer))
    }

    /// Build an engine with an explicit backend (tests inject scripted ones).
    pub fn with_scorer(
        store: AmlStore,
        config: AmlConfig,
        scorer: Box<dyn ScoringBackend>,
    ) -> Self {
        Self {
            store,
            config,
            rules: RuleEngine::new(),
            scorer,
        }
    }

    pub fn config(&self) -> &AmlConfig {
        &self.config
    }

    // ── Operations ─────────────────────────────────────────────

    pub fn submit_transaction(&self, req: &TransactionRequest) -> AmlResult<SubmissionOutcome> {
        transaction_service::submit(&self.store, &self.config, &self.rules, self.scorer.as_ref(), req)
    }

    pub fn decide_case(&self, req: &DecisionRequest) -> AmlResult<DecisionOutcome> {
        case_service::decide(&self.store, req)
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn transaction(&self, transaction_id: &str) -> AmlResult<Option<Transaction>> {
        self.store.get_transaction(transaction_id)
    }

    pub fn transactions(
        &self,
        account_number: Option<&str>,
        transaction_type: Option<TransactionType>,
        transaction_status: Option<TransactionStatus>,
        limit: i64,
        offset: i64,
    ) -> AmlResult<Vec<Transaction>> {
        self.store
            .list_transactions(account_number, transaction_type, transaction_status, limit, offset)
    }

    pub fn case(&self, case_id: &str) -> AmlResult<Option<Case>> {
        self.store.get_case(case_id)
    }

    pub fn cases(&self, status: Option<CaseStatus>, limit: i64, offset: i64) -> AmlResult<Vec<Case>> {
        self.store.list_cases(status, limit, offset)
    }

    pub fn alerts_for_transaction(&self, transaction_id: &str) -> AmlResult<Vec<Alert>> {
        self.store.alerts_for_transaction(transaction_id)
    }

    pub fn case_for_transaction(&self, transaction_id: &str) -> AmlResult<Option<Case>> {
        self.store.case_for_transaction(transaction_id)
    }

    pub fn decisions(&self, case_id: &str) -> AmlResult<Vec<CaseDecision>> {
        self.store.decisions_for_case(case_id)
    }

    pub fn documents(&self, case_id: &str) -> AmlResult<Vec<CaseDocument>> {
        self.store.documents_for_case(case_id)
    }

    pub fn sar_draft(&self, case_id: &str) -> AmlResult<Option<CaseDocument>> {
        case_service::sar_draft(&self.store, case_id)
    }
}
